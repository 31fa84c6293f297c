//! A drop guard that aborts the process unless explicitly defused.
//!
//! Mirrors the teacher's `unwind::AbortIfPanic`: construct it right before calling code
//! that might panic a second time (e.g. a user-supplied callback reacting to a first
//! panic), then `mem::forget` it once that call returns successfully. If the call
//! unwinds instead, the guard's `Drop` runs during that unwind and aborts — a second
//! panic inside panic-handling code is exactly the "degrade silently" case core
//! invariants can't tolerate.

use std::process;

pub(crate) struct AbortIfPanic;

impl Drop for AbortIfPanic {
    fn drop(&mut self) {
        process::abort();
    }
}

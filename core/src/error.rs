//! Error taxonomy for the core.
//!
//! Steady-state scheduling never fails: duplicate/missing group operations are status
//! enums (see [`crate::registry::AddOutcome`] / [`crate::registry::RemoveOutcome`]), and
//! schedulers are forbidden from propagating internal errors out of `select_next`. The one
//! fallible path is starting the worker threads.

use std::io;

/// Failure constructing or starting a [`Service`](crate::service::Service).
#[derive(thiserror::Error, Debug)]
pub enum ServiceBuildError {
    /// `std::thread::Builder::spawn` failed for one of the worker threads.
    #[error("failed to spawn worker thread {index}: {source}")]
    ThreadSpawn {
        /// Index of the worker thread that failed to spawn, in `0..thread_count`.
        index: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

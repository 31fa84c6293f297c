//! Per-worker generation and epoch tracking for the registry's reclamation protocol.
//!
//! Two independent counters protect two independent things:
//!
//! - **Generation** protects *snapshot storage*: the `Vec<GroupRef>` a [`crate::registry::Registry`]
//!   swaps out on every `add`/`remove`/`clear`. A worker publishes the current generation into
//!   its slot before it loads the snapshot pointer, so the published value is always a safe
//!   lower bound on what that worker might still be holding a reference to.
//! - **Epoch** protects *group identity*: it only advances when the caller explicitly calls
//!   `notify_group_destroyed`, and advancing blocks until every worker's published epoch has
//!   caught up. This is the barrier that lets a caller safely drop/free a group's storage
//!   once `notify_group_destroyed` returns.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// One worker's published generation/epoch, shared between the worker loop (writer) and
/// [`ThreadTrackers`] (reader). Every worker writes its own slot on every loop iteration,
/// so padding them apart keeps one thread's publish from invalidating its neighbor's cache
/// line.
#[derive(Debug)]
struct Slot {
    generation: CachePadded<AtomicU64>,
    epoch: CachePadded<AtomicU64>,
}

/// Registry of every running worker's [`Slot`], plus the global epoch counter.
///
/// Built fresh by [`crate::service::Service::start`] and torn down on `wait_for_stop`, just
/// like the original's per-`start()` reallocation of its generation/epoch vectors.
pub(crate) struct ThreadTrackers {
    slots: Mutex<Vec<Arc<Slot>>>,
    global_epoch: AtomicU64,
}

/// A single worker's handle into the tracker registry, captured directly in its thread
/// closure at spawn time. Unlike the C++ original's `thread_local` pointer reassignment,
/// Rust workers already know their index when the closure is built, so there's no need for
/// a second thread-local indirection.
pub(crate) struct ThreadHandle {
    slot: Arc<Slot>,
}

impl ThreadHandle {
    /// Publish this worker's current view of the registry generation and global epoch.
    /// Must be called once per loop iteration, before touching the group snapshot.
    pub(crate) fn publish(&self, generation: u64, epoch: u64) {
        self.slot.generation.store(generation, Ordering::Release);
        self.slot.epoch.store(epoch, Ordering::Release);
    }
}

impl ThreadTrackers {
    pub(crate) fn new(thread_count: usize) -> Self {
        let mut slots = Vec::with_capacity(thread_count);
        for _ in 0..thread_count {
            slots.push(Arc::new(Slot {
                generation: CachePadded::new(AtomicU64::new(0)),
                epoch: CachePadded::new(AtomicU64::new(0)),
            }));
        }
        ThreadTrackers {
            slots: Mutex::new(slots),
            global_epoch: AtomicU64::new(0),
        }
    }

    /// Hand out the handle for worker `index`. Panics if `index >= thread_count` passed to
    /// [`ThreadTrackers::new`]; callers only ever iterate `0..thread_count`.
    pub(crate) fn handle_for(&self, index: usize) -> ThreadHandle {
        let slot = self.slots.lock().unwrap()[index].clone();
        ThreadHandle { slot }
    }

    pub(crate) fn global_epoch(&self) -> u64 {
        self.global_epoch.load(Ordering::Acquire)
    }

    /// Minimum published generation across every registered worker. `None` if no workers
    /// are registered, mirroring the original's "be conservative with no threads" guard.
    pub(crate) fn min_generation(&self) -> Option<u64> {
        let slots = self.slots.lock().unwrap();
        slots
            .iter()
            .map(|s| s.generation.load(Ordering::Acquire))
            .min()
    }

    /// Bump the global epoch and spin-yield until every worker has published an epoch at
    /// least as new. Mirrors `notifyGroupDestroyed`'s wait loop; only called while the
    /// service is running (the caller is responsible for skipping this while stopped, same
    /// as the original — workers that aren't looping will never advance their epoch).
    pub(crate) fn advance_epoch_and_wait(&self) {
        let new_epoch = self.global_epoch.fetch_add(1, Ordering::AcqRel) + 1;
        crate::log::log_event(crate::log::Event::EpochAdvanced { epoch: new_epoch });

        loop {
            let all_caught_up = {
                let slots = self.slots.lock().unwrap();
                slots
                    .iter()
                    .all(|s| s.epoch.load(Ordering::Acquire) >= new_epoch)
            };
            if all_caught_up {
                break;
            }
            thread::yield_now();
        }

        crate::log::log_event(crate::log::Event::EpochQuiesced { epoch: new_epoch });
    }
}

//! The lock-free, copy-on-write registry of registered work groups.
//!
//! A single atomic pointer holds the current *snapshot* — an immutable, deduplicated,
//! insertion-ordered list of groups. Mutations build a new snapshot and swap it in with a
//! CAS loop; the old snapshot is handed to the retired list rather than freed immediately,
//! since some worker may still be mid-iteration over it (see [`crate::epoch`]).

use crate::epoch::ThreadTrackers;
use crate::group::{ContractGroup, GroupId, GroupRef};
use crate::log::{log_event, Event};
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type Snapshot = Vec<GroupRef>;

/// Result of [`Registry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Result of [`Registry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// An old snapshot waiting for every worker to move past it.
struct Retired {
    snapshot: *mut Snapshot,
    retired_generation: u64,
}

// The raw pointer is only ever dereferenced by `Registry::reclaim`/`drop`, and only after
// it has been unlinked from the live `groups` pointer — never concurrently.
unsafe impl Send for Retired {}

pub(crate) struct Registry {
    groups: AtomicPtr<Snapshot>,
    generation: AtomicU64,
    retired: Mutex<Vec<Retired>>,
    /// The running service's thread trackers, if any. Consulted by every `retire` so
    /// reclamation happens automatically on each mutation rather than waiting for a
    /// caller to invoke it manually, matching `WorkService::retireVector`'s behavior of
    /// calling `reclaimRetiredVectors()` on every retire.
    trackers: Mutex<Option<Arc<ThreadTrackers>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            groups: AtomicPtr::new(Box::into_raw(Box::new(Vec::new()))),
            generation: AtomicU64::new(0),
            retired: Mutex::new(Vec::new()),
            trackers: Mutex::new(None),
        }
    }

    /// Install (or, on `None`, clear) the running service's thread trackers. Called by
    /// [`crate::service::Service::start`]/`wait_for_stop` alongside its own bookkeeping of
    /// the same trackers, so `retire` has a `min_generation` source to reclaim against.
    pub(crate) fn set_trackers(&self, trackers: Option<Arc<ThreadTrackers>>) {
        *self.trackers.lock().unwrap() = trackers;
    }

    /// Current registry generation. Workers publish this into their per-thread slot once
    /// per loop iteration before touching the snapshot (see [`crate::epoch`]).
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run `f` against the current snapshot.
    ///
    /// The snapshot pointer is valid for the duration of this call under the registry's
    /// generation-reclamation protocol: a snapshot is only freed once every worker's
    /// published generation has moved past the generation at which it was retired, and
    /// workers always publish their generation *before* calling this.
    pub(crate) fn with_snapshot<R>(&self, f: impl FnOnce(&[GroupRef]) -> R) -> R {
        let ptr = self.groups.load(Ordering::Acquire);
        // SAFETY: see the doc comment above; `ptr` is never dangling because the
        // reclamation protocol only frees retired (non-live) snapshots once quiesced.
        let snapshot: &Snapshot = unsafe { &*ptr };
        f(snapshot.as_slice())
    }

    pub(crate) fn group_count(&self) -> usize {
        self.with_snapshot(|groups| groups.len())
    }

    /// Publish `old ∪ {group}`. Returns `AlreadyPresent` without mutating anything if
    /// `group` is already registered.
    pub(crate) fn add(&self, group: GroupRef) -> AddOutcome {
        loop {
            let current_ptr = self.groups.load(Ordering::Acquire);
            let current: &Snapshot = unsafe { &*current_ptr };

            if current.iter().any(|g| g.id() == group.id()) {
                log_event(Event::GroupAlreadyPresent { group: group.id() });
                return AddOutcome::AlreadyPresent;
            }

            let mut next = current.clone();
            next.push(group);
            let next_ptr = Box::into_raw(Box::new(next));

            match self.groups.compare_exchange_weak(
                current_ptr,
                next_ptr,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                    self.retire(current_ptr);
                    log_event(Event::GroupAdded {
                        group: group.id(),
                        generation,
                    });
                    return AddOutcome::Added;
                }
                Err(_) => {
                    // Lost the race; drop our speculative build and retry.
                    unsafe {
                        drop(Box::from_raw(next_ptr));
                    }
                }
            }
        }
    }

    /// Publish `old \ {group}`. Returns `NotFound` without mutating anything if `group`
    /// isn't registered. Looks up by [`GroupId`], not by reference, matching the trait
    /// object's lack of pointer identity.
    pub(crate) fn remove(&self, id: GroupId) -> RemoveOutcome {
        loop {
            let current_ptr = self.groups.load(Ordering::Acquire);
            let current: &Snapshot = unsafe { &*current_ptr };

            if !current.iter().any(|g| g.id() == id) {
                log_event(Event::GroupNotFound { group: id });
                return RemoveOutcome::NotFound;
            }

            let next: Snapshot = current.iter().copied().filter(|g| g.id() != id).collect();
            let next_ptr = Box::into_raw(Box::new(next));

            match self.groups.compare_exchange_weak(
                current_ptr,
                next_ptr,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                    self.retire(current_ptr);
                    log_event(Event::GroupRemoved {
                        group: id,
                        generation,
                    });
                    return RemoveOutcome::Removed;
                }
                Err(_) => unsafe {
                    drop(Box::from_raw(next_ptr));
                },
            }
        }
    }

    /// Publish an empty snapshot.
    pub(crate) fn clear(&self) {
        let empty: Snapshot = Vec::new();
        let next_ptr = Box::into_raw(Box::new(empty));
        let old_ptr = self.groups.swap(next_ptr, Ordering::AcqRel);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.retire(old_ptr);
        log_event(Event::RegistryCleared { generation });
    }

    /// Push `snapshot` onto the retired list, then opportunistically reclaim: every
    /// mutation is a chance to drop snapshots the currently-running workers have already
    /// moved past, rather than letting them pile up until some caller remembers to call
    /// [`Registry::reclaim`] by hand.
    fn retire(&self, snapshot: *mut Snapshot) {
        let retired_generation = self.generation.load(Ordering::Acquire);
        {
            let mut guard = self.retired.lock().unwrap();
            guard.push(Retired {
                snapshot,
                retired_generation,
            });
        }
        log_event(Event::SnapshotRetired {
            generation: retired_generation,
        });

        let min_generation = self
            .trackers
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|t| t.min_generation());
        self.reclaim(min_generation);
    }

    /// Delete every retired snapshot that every worker has definitely moved past.
    ///
    /// `min_generation` is the minimum of all workers' *published* generations, computed
    /// by [`crate::epoch::ThreadTrackers`]. `None` means no workers are registered yet
    /// (service not running) — nothing can be safely reclaimed, so this is a no-op.
    pub(crate) fn reclaim(&self, min_generation: Option<u64>) {
        let min_generation = match min_generation {
            Some(g) => g,
            None => return,
        };
        let mut guard = self.retired.lock().unwrap();
        let before = guard.len();
        guard.retain(|r| {
            if r.retired_generation < min_generation {
                unsafe {
                    drop(Box::from_raw(r.snapshot));
                }
                false
            } else {
                true
            }
        });
        let reclaimed = before - guard.len();
        if reclaimed > 0 {
            log_event(Event::SnapshotsReclaimed {
                count: reclaimed,
                min_generation,
            });
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        unsafe {
            drop(Box::from_raw(self.groups.load(Ordering::Acquire)));
        }
        for retired in self.retired.get_mut().unwrap().drain(..) {
            unsafe {
                drop(Box::from_raw(retired.snapshot));
            }
        }
    }
}

// `Registry` is only ever accessed through `&Registry` from multiple threads; all
// mutation goes through atomics or the `retired` mutex.
unsafe impl Sync for Registry {}

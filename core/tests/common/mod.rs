//! Shared test fixtures: a synthetic `ContractGroup` usable across every integration test.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use workpool_core::group::{ContractGroup, ContractHandle, GroupId};

/// A group backed by a plain counter of ready items. `select_for_execution` claims one
/// item at a time via CAS; `complete_execution` is a no-op since this fixture has no
/// richer contract state machine to drive.
pub struct FakeGroup {
    id: GroupId,
    ready: AtomicUsize,
    executing: AtomicUsize,
    stopping: AtomicBool,
    executed_log: Mutex<Vec<usize>>,
}

impl FakeGroup {
    pub fn new(id: u64, ready: usize) -> Self {
        FakeGroup {
            id: GroupId(id),
            ready: AtomicUsize::new(ready),
            executing: AtomicUsize::new(0),
            stopping: AtomicBool::new(false),
            executed_log: Mutex::new(Vec::new()),
        }
    }

    pub fn leak(id: u64, ready: usize) -> &'static FakeGroup {
        Box::leak(Box::new(FakeGroup::new(id, ready)))
    }

    pub fn set_stopping(&self, stopping: bool) {
        self.stopping.store(stopping, Ordering::Relaxed);
    }

    pub fn executed_count(&self) -> usize {
        self.executed_log.lock().unwrap().len()
    }

    pub fn add_ready(&self, count: usize) {
        self.ready.fetch_add(count, Ordering::Relaxed);
    }
}

impl ContractGroup for FakeGroup {
    fn id(&self) -> GroupId {
        self.id
    }

    fn ready_count(&self) -> usize {
        self.ready.load(Ordering::Relaxed)
    }

    fn executing_count(&self) -> usize {
        self.executing.load(Ordering::Relaxed)
    }

    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Relaxed)
    }

    fn select_for_execution(&self) -> Option<ContractHandle> {
        let mut current = self.ready.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return None;
            }
            match self.ready.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.executing.fetch_add(1, Ordering::Relaxed);
                    return Some(ContractHandle { slot: current - 1 });
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn execute_contract(&self, contract: &ContractHandle) {
        self.executed_log.lock().unwrap().push(contract.slot);
    }

    fn complete_execution(&self, _contract: ContractHandle) {
        self.executing.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A group whose main-thread work is tracked separately from its worker-thread ready
/// count, for exercising the main-thread pump in isolation.
pub struct MainThreadGroup {
    id: GroupId,
    main_thread_ready: AtomicUsize,
}

impl MainThreadGroup {
    pub fn leak(id: u64, main_thread_ready: usize) -> &'static MainThreadGroup {
        Box::leak(Box::new(MainThreadGroup {
            id: GroupId(id),
            main_thread_ready: AtomicUsize::new(main_thread_ready),
        }))
    }
}

impl ContractGroup for MainThreadGroup {
    fn id(&self) -> GroupId {
        self.id
    }
    fn ready_count(&self) -> usize {
        0
    }
    fn executing_count(&self) -> usize {
        0
    }
    fn is_stopping(&self) -> bool {
        false
    }
    fn select_for_execution(&self) -> Option<ContractHandle> {
        None
    }
    fn execute_contract(&self, _contract: &ContractHandle) {}
    fn complete_execution(&self, _contract: ContractHandle) {}

    fn has_main_thread_work(&self) -> bool {
        self.main_thread_ready.load(Ordering::Relaxed) > 0
    }

    fn execute_main_thread_work(&self, max: usize) -> usize {
        let ready = self.main_thread_ready.load(Ordering::Relaxed);
        let take = ready.min(max);
        self.main_thread_ready.fetch_sub(take, Ordering::Relaxed);
        take
    }
}

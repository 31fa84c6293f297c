//! The worker loop: one instance of this runs per thread spawned by
//! [`crate::service::Service::start`].
//!
//! Each iteration publishes this thread's generation/epoch, takes a snapshot of the
//! registry, asks the scheduler for a group, and either executes one contract from it or
//! backs off. Ported from `WorkService::executeWork`; the condition-variable parking
//! becomes a `Condvar` pair owned by the service and shared here via `Arc`.

use crate::config::PanicHandler;
use crate::epoch::{ThreadHandle, ThreadTrackers};
use crate::group::GroupId;
use crate::log::{log_event, Event};
use crate::registry::Registry;
use crate::scheduler::{Scheduler, SchedulingContext};
use crate::unwind::AbortIfPanic;
use std::any::Any;
use std::mem;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Shared wake channel between workers and whoever calls
/// [`crate::group::ConcurrencyProvider::notify_work_available`].
pub(crate) struct WorkSignal {
    available: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl WorkSignal {
    pub(crate) fn new() -> Self {
        WorkSignal {
            available: AtomicBool::new(false),
            mutex: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn notify(&self) {
        self.available.store(true, Ordering::Release);
        self.condvar.notify_one();
    }

    pub(crate) fn notify_all(&self) {
        self.available.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Park for up to `timeout`, waking early if `notify`/`notify_all` fires or
    /// `should_wake` starts returning true (used to recheck the stop flag).
    fn park(&self, timeout: Duration, should_wake: impl Fn() -> bool) {
        let guard = self.mutex.lock().unwrap();
        let (_guard, _) = self
            .condvar
            .wait_timeout_while(guard, timeout, |_| {
                !self.available.load(Ordering::Acquire) && !should_wake()
            })
            .unwrap();
        self.available.store(false, Ordering::Release);
    }
}

/// Everything a worker thread's closure needs, bundled so `Service::start` can build one
/// and move it into each spawned thread.
pub(crate) struct WorkerContext {
    pub(crate) thread_id: usize,
    pub(crate) registry: Arc<Registry>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) signal: Arc<WorkSignal>,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) trackers: Arc<ThreadTrackers>,
    pub(crate) thread_handle: ThreadHandle,
    pub(crate) max_soft_failures: usize,
    pub(crate) panic_handler: Option<PanicHandler>,
}

/// The loop body itself. Runs until `ctx.stop` is observed true.
pub(crate) fn run(ctx: WorkerContext) {
    let WorkerContext {
        thread_id,
        registry,
        scheduler,
        signal,
        stop,
        trackers,
        thread_handle,
        max_soft_failures,
        panic_handler,
    } = ctx;

    let mut last_executed_group: Option<GroupId> = None;
    let mut soft_failures: usize = 0;

    while !stop.load(Ordering::Acquire) {
        let generation = registry.generation();
        let epoch = trackers.global_epoch();
        thread_handle.publish(generation, epoch);

        let empty = registry.with_snapshot(|groups| groups.is_empty());
        if empty {
            signal.park(Duration::from_millis(1), || stop.load(Ordering::Acquire));
            continue;
        }

        let scheduling_ctx = SchedulingContext {
            thread_id,
            consecutive_failures: soft_failures,
            last_executed_group,
        };

        let outcome = registry.with_snapshot(|groups| {
            let result = scheduler.select_next(groups, &scheduling_ctx);
            match result.group {
                Some(group) if group.is_stopping() => WorkerOutcome::NoWork { should_sleep: false },
                Some(group) => match group.select_for_execution() {
                    Some(contract) => {
                        if stop.load(Ordering::Acquire) {
                            group.complete_execution(contract);
                            WorkerOutcome::Shutdown
                        } else {
                            let result = catch_unwind(AssertUnwindSafe(|| {
                                group.execute_contract(&contract);
                            }));
                            group.complete_execution(contract);
                            match result {
                                Ok(()) => {
                                    log_event(Event::ContractExecuted {
                                        group: group.id(),
                                        thread_id,
                                    });
                                    scheduler.notify_executed(group, thread_id);
                                    WorkerOutcome::Executed { group: group.id() }
                                }
                                Err(payload) => {
                                    log_event(Event::ThreadPanicked {
                                        thread_id,
                                        group: group.id(),
                                    });
                                    WorkerOutcome::Panicked { payload }
                                }
                            }
                        }
                    }
                    None => WorkerOutcome::NoWork { should_sleep: false },
                },
                None => WorkerOutcome::NoWork {
                    should_sleep: result.should_sleep,
                },
            }
        });

        match outcome {
            WorkerOutcome::Shutdown => break,
            WorkerOutcome::Executed { group } => {
                last_executed_group = Some(group);
                soft_failures = 0;
            }
            WorkerOutcome::Panicked { payload } => {
                // Run the handler outside the snapshot closure: a misbehaving handler
                // must not be able to extend the scope of the unsafe snapshot borrow.
                match &panic_handler {
                    Some(handler) => {
                        // If the handler itself panics, the guard's `Drop` aborts.
                        let abort_guard = AbortIfPanic;
                        handler(payload);
                        mem::forget(abort_guard);
                    }
                    None => {
                        // Default panic handler aborts.
                        let _ = AbortIfPanic; // let this drop.
                    }
                }
                soft_failures = 0;
            }
            WorkerOutcome::NoWork { should_sleep } => {
                if should_sleep || soft_failures >= max_soft_failures {
                    log_event(Event::WorkerParked {
                        thread_id,
                        timeout_ms: 10,
                    });
                    signal.park(Duration::from_millis(10), || stop.load(Ordering::Acquire));
                    log_event(Event::WorkerWoke { thread_id });
                    soft_failures = 0;
                } else {
                    soft_failures += 1;
                    std::thread::yield_now();
                }
            }
        }
    }

    log_event(Event::WorkerShuttingDown { thread_id });
}

enum WorkerOutcome {
    Executed { group: GroupId },
    NoWork { should_sleep: bool },
    Panicked { payload: Box<dyn Any + Send> },
    Shutdown,
}

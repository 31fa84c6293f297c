//! The service: owns the registry, the scheduler, and the worker threads, and is the
//! entry point applications construct. Ported from `WorkService`.

use crate::config::Config;
use crate::epoch::ThreadTrackers;
use crate::error::ServiceBuildError;
use crate::group::{ConcurrencyProvider, ContractGroup, GroupId, GroupRef};
use crate::main_thread;
use crate::registry::{AddOutcome, Registry, RemoveOutcome};
use crate::scheduler::adaptive::AdaptiveRankingScheduler;
use crate::scheduler::Scheduler;
use crate::worker::{self, WorkSignal, WorkerContext};

pub use crate::main_thread::MainThreadWorkResult;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Fixed-size worker pool coordinating scheduling and lifecycle across a set of
/// independently-managed work groups.
///
/// Construct with [`ServiceBuilder`] or [`Service::new`]. [`Service::add_group`] installs
/// `self` as the group's [`ConcurrencyProvider`] (see [`crate::group::GroupRef`] for why
/// that reference must be `'static`), so a `Service` that will register groups is
/// typically stored behind a `Box::leak` or a process-lifetime static, the same way the
/// groups themselves are.
pub struct Service {
    config: Config,
    registry: Arc<Registry>,
    scheduler: Arc<dyn Scheduler>,
    signal: Arc<WorkSignal>,
    stop: Arc<AtomicBool>,
    trackers: Mutex<Option<Arc<ThreadTrackers>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    max_soft_failures: AtomicUsize,
    failure_sleep_ns: AtomicU64,
}

/// Result of a completed [`Service::start`] call is always `Ok(())`; the `Result` return
/// on construction exists for [`ServiceBuildError`] raised by thread spawning.
impl Service {
    /// Build a service with the default [`AdaptiveRankingScheduler`].
    pub fn new(config: Config) -> Result<Service, ServiceBuildError> {
        let config = config.resolved();
        let scheduler = Arc::new(AdaptiveRankingScheduler::new(&config.scheduler_config));
        Ok(Service::assemble(config, scheduler))
    }

    /// Build a service with a caller-supplied scheduler.
    pub fn with_scheduler(
        config: Config,
        scheduler: Box<dyn Scheduler>,
    ) -> Result<Service, ServiceBuildError> {
        let config = config.resolved();
        Ok(Service::assemble(config, Arc::from(scheduler)))
    }

    fn assemble(config: Config, scheduler: Arc<dyn Scheduler>) -> Service {
        Service {
            max_soft_failures: AtomicUsize::new(config.max_soft_failures),
            failure_sleep_ns: AtomicU64::new(config.failure_sleep_ns),
            config,
            registry: Arc::new(Registry::new()),
            scheduler,
            signal: Arc::new(WorkSignal::new()),
            stop: Arc::new(AtomicBool::new(false)),
            trackers: Mutex::new(None),
            threads: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Spawn `config.thread_count` worker threads. No-op if already running.
    ///
    /// Unlike [`Service::add_group`], this only needs `&self`: every worker closure
    /// captures owned `Arc` clones (registry, scheduler, trackers), never a borrow of
    /// `self` itself.
    pub fn start(&self) -> Result<(), ServiceBuildError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.stop.store(false, Ordering::Release);
        crate::log::log_event(crate::log::Event::ServiceStarted {
            scheduler: self.scheduler.name(),
            thread_count: self.config.thread_count,
        });
        let trackers = Arc::new(ThreadTrackers::new(self.config.thread_count));
        *self.trackers.lock().unwrap() = Some(trackers.clone());
        self.registry.set_trackers(Some(trackers.clone()));

        let mut threads = Vec::with_capacity(self.config.thread_count);
        for index in 0..self.config.thread_count {
            let mut builder = std::thread::Builder::new();
            if let Some(name) = &self.config.thread_name {
                builder = builder.name(format!("{}-{}", name, index));
            }
            if let Some(stack_size) = self.config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let ctx = WorkerContext {
                thread_id: index,
                registry: self.registry.clone(),
                scheduler: self.scheduler.clone(),
                signal: self.signal.clone(),
                stop: self.stop.clone(),
                trackers: trackers.clone(),
                thread_handle: trackers.handle_for(index),
                max_soft_failures: self.max_soft_failures.load(Ordering::Relaxed),
                panic_handler: self.config.panic_handler.clone(),
            };

            let on_start = self.config.on_thread_start.clone();
            let on_exit = self.config.on_thread_exit.clone();

            let spawn_result = builder.spawn(move || {
                if let Some(on_start) = on_start {
                    on_start(index);
                }
                worker::run(ctx);
                if let Some(on_exit) = on_exit {
                    on_exit(index);
                }
            });

            match spawn_result {
                Ok(handle) => threads.push(handle),
                Err(source) => {
                    // Stop whatever we already spawned so we don't leak running threads
                    // on a partial failure.
                    self.running.store(false, Ordering::Release);
                    self.stop.store(true, Ordering::Release);
                    self.signal.notify_all();
                    for handle in threads.drain(..) {
                        let _ = handle.join();
                    }
                    *self.trackers.lock().unwrap() = None;
                    self.registry.set_trackers(None);
                    return Err(ServiceBuildError::ThreadSpawn { index, source });
                }
            }
        }

        *self.threads.lock().unwrap() = threads;
        Ok(())
    }

    /// Signal threads to stop without waiting for them to exit.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.signal.notify_all();
    }

    /// Join every worker thread. Must be called after [`Service::request_stop`] (or via
    /// [`Service::stop`]) to actually make progress.
    pub fn wait_for_stop(&self) {
        let mut threads = self.threads.lock().unwrap();
        for handle in threads.drain(..) {
            let _ = handle.join();
        }
        self.running.store(false, Ordering::Release);
        *self.trackers.lock().unwrap() = None;
        self.registry.set_trackers(None);
    }

    /// `request_stop()` followed by `wait_for_stop()`.
    pub fn stop(&self) {
        self.request_stop();
        self.wait_for_stop();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Register `group`. Installs this service as the group's concurrency provider.
    ///
    /// Requires `&'static self` because `set_concurrency_provider` hands the group a
    /// `&'static dyn ConcurrencyProvider` it may retain indefinitely.
    pub fn add_group(&'static self, group: GroupRef) -> AddOutcome {
        let outcome = self.registry.add(group);
        if outcome == AddOutcome::Added {
            self.registry
                .with_snapshot(|groups| self.scheduler.notify_groups_changed(groups));
            group.set_concurrency_provider(Some(self));
        }
        outcome
    }

    pub fn remove_group(&self, group: GroupRef) -> RemoveOutcome {
        let outcome = self.registry.remove(group.id());
        if outcome == RemoveOutcome::Removed {
            self.registry
                .with_snapshot(|groups| self.scheduler.notify_groups_changed(groups));
            group.set_concurrency_provider(None);
        }
        outcome
    }

    pub fn clear(&self) {
        self.registry.clear();
        self.registry
            .with_snapshot(|groups| self.scheduler.notify_groups_changed(groups));
        self.scheduler.reset();
    }

    pub fn group_count(&self) -> usize {
        self.registry.group_count()
    }

    pub fn thread_count(&self) -> usize {
        self.config.thread_count
    }

    pub fn max_soft_failures(&self) -> usize {
        self.max_soft_failures.load(Ordering::Relaxed)
    }

    pub fn set_max_soft_failures(&self, value: usize) {
        self.max_soft_failures.store(value, Ordering::Relaxed);
    }

    pub fn failure_sleep_ns(&self) -> u64 {
        self.failure_sleep_ns.load(Ordering::Relaxed)
    }

    pub fn set_failure_sleep_ns(&self, value: u64) {
        self.failure_sleep_ns.store(value, Ordering::Relaxed);
    }

    pub fn execute_main_thread_work(&self, max_contracts: usize) -> MainThreadWorkResult {
        self.registry
            .with_snapshot(|groups| main_thread::pump(groups, max_contracts))
    }

    pub fn execute_main_thread_work_on(&self, group: GroupRef, max_contracts: usize) -> usize {
        main_thread::pump_group(group, max_contracts)
    }

    pub fn has_main_thread_work(&self) -> bool {
        self.registry.with_snapshot(main_thread::has_work)
    }

    /// Quiescence barrier for a group about to be freed by the caller. Removes `group`
    /// from the registry, then — only while running — waits until every worker's
    /// published epoch has caught up, guaranteeing no worker still holds a reference to
    /// `group` once this returns.
    pub fn notify_group_destroyed(&self, group: GroupRef) {
        self.remove_group(group);

        if self.is_running() {
            if let Some(trackers) = self.trackers.lock().unwrap().as_ref() {
                trackers.advance_epoch_and_wait();
            }
        }
    }

    /// Opportunistically reclaim retired snapshots the currently-registered workers have
    /// all moved past. Safe to call at any time; a no-op if nothing is reclaimable yet.
    pub fn reclaim(&self) {
        let min_generation = self
            .trackers
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|t| t.min_generation());
        self.registry.reclaim(min_generation);
    }
}

impl ConcurrencyProvider for Service {
    fn notify_work_available(&self) {
        self.signal.notify();
    }
}

/// Fluent builder for [`Service`], mirroring `rayon_core::ThreadPoolBuilder`: configure via
/// chained `with_*`-style methods, then call [`ServiceBuilder::build`].
#[derive(Default)]
pub struct ServiceBuilder {
    config: Config,
    scheduler: Option<Box<dyn Scheduler>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        ServiceBuilder::default()
    }

    pub fn thread_count(mut self, count: usize) -> Self {
        self.config.thread_count = count;
        self
    }

    pub fn max_soft_failures(mut self, count: usize) -> Self {
        self.config.max_soft_failures = count;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = Some(name.into());
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.config.stack_size = Some(bytes);
        self
    }

    pub fn panic_handler(
        mut self,
        handler: impl Fn(Box<dyn std::any::Any + Send>) + Send + Sync + 'static,
    ) -> Self {
        self.config.panic_handler = Some(Arc::new(handler));
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use a scheduler other than the default [`AdaptiveRankingScheduler`].
    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    pub fn build(self) -> Result<Service, ServiceBuildError> {
        match self.scheduler {
            Some(scheduler) => Service::with_scheduler(self.config, scheduler),
            None => Service::new(self.config),
        }
    }
}

// SAFETY: all mutable access to `registry`/`scheduler`/counters goes through atomics or
// the `threads`/`trackers` mutexes; `ContractGroup`/`Scheduler` implementations are
// themselves required to be `Send + Sync`.
unsafe impl Sync for Service {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ContractHandle;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    struct CountingGroup {
        id: GroupId,
        ready: StdAtomicUsize,
        executed: StdAtomicUsize,
    }

    impl ContractGroup for CountingGroup {
        fn id(&self) -> GroupId {
            self.id
        }
        fn ready_count(&self) -> usize {
            self.ready.load(Ordering::Relaxed)
        }
        fn executing_count(&self) -> usize {
            0
        }
        fn is_stopping(&self) -> bool {
            false
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
                    Ok(_) => return Some(ContractHandle { slot: current - 1 }),
                    Err(actual) => current = actual,
                }
            }
        }
        fn execute_contract(&self, _contract: &ContractHandle) {
            self.executed.fetch_add(1, Ordering::Relaxed);
        }
        fn complete_execution(&self, _contract: ContractHandle) {}
    }

    fn leak_group(id: u64, ready: usize) -> (&'static CountingGroup, GroupRef) {
        let boxed: &'static CountingGroup = Box::leak(Box::new(CountingGroup {
            id: GroupId(id),
            ready: StdAtomicUsize::new(ready),
            executed: StdAtomicUsize::new(0),
        }));
        (boxed, boxed as GroupRef)
    }

    fn leak_service(config: Config) -> &'static Service {
        Box::leak(Box::new(Service::new(config).unwrap()))
    }

    #[test]
    fn add_remove_and_count_groups() {
        let service = leak_service(Config {
            thread_count: 1,
            ..Config::default()
        });
        let (_, g) = leak_group(1, 0);
        assert_eq!(service.add_group(g), AddOutcome::Added);
        assert_eq!(service.group_count(), 1);
        assert_eq!(service.remove_group(g), RemoveOutcome::Removed);
        assert_eq!(service.group_count(), 0);
    }

    #[test]
    fn all_ready_work_gets_executed() {
        let service = leak_service(Config {
            thread_count: 2,
            ..Config::default()
        });
        let (group, g) = leak_group(2, 100);
        service.add_group(g);
        service.start().unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while group.executed.load(Ordering::Relaxed) < 100 && std::time::Instant::now() < deadline
        {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        assert_eq!(group.executed.load(Ordering::Relaxed), 100);
        service.stop();
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let service = leak_service(Config {
            thread_count: 1,
            ..Config::default()
        });
        service.start().unwrap();
        service.start().unwrap();
        assert!(service.is_running());
        service.stop();
        assert!(!service.is_running());
    }
}

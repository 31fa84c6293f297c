//! Plain-data configuration structs, plus a small fluent builder mirroring
//! `rayon_core::ThreadPoolBuilder`'s `with_*` surface.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Invoked from the worker-loop boundary when `execute_contract` panics. Default (when
/// unset) aborts the process, matching the teacher's `unwind::AbortIfPanic` discipline:
/// core invariants must never be allowed to degrade silently.
pub type PanicHandler = Arc<dyn Fn(Box<dyn Any + Send>) + Send + Sync>;

/// Invoked once from inside each worker thread right after it starts, before it enters the
/// scheduling loop. Mirrors `ThreadPoolBuilder::start_handler`.
pub type ThreadStartHandler = Arc<dyn Fn(usize) + Send + Sync>;

/// Invoked once from inside each worker thread right before it exits. Mirrors
/// `ThreadPoolBuilder::exit_handler`.
pub type ThreadExitHandler = Arc<dyn Fn(usize) + Send + Sync>;

/// Configuration consumed by [`crate::scheduler::adaptive::AdaptiveRankingScheduler`] and
/// available (but ignorable) to every other [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Sticky-group budget: how many consecutive executions a thread takes from the same
    /// group before re-consulting the ranking. Adaptive-only.
    pub max_consecutive_executions: usize,
    /// How many executions occur between ranking recomputations. Adaptive-only.
    pub update_cycle_interval: usize,
    /// Legacy hint, nanoseconds to sleep when no work is found. The CV-based worker loop
    /// ignores this; kept for API compatibility and observability.
    pub failure_sleep_ns: u64,
    /// Number of worker threads the scheduler should assume. Filled in by
    /// [`Config`]/[`ServiceBuilder`] from the resolved thread count before the scheduler is
    /// constructed.
    pub thread_count: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_consecutive_executions: 8,
            update_cycle_interval: 16,
            failure_sleep_ns: 1,
            thread_count: 0,
        }
    }
}

/// Configuration for a [`Service`](crate::service::Service).
#[derive(Clone)]
pub struct Config {
    /// Worker thread count. `0` means hardware concurrency (`num_cpus::get()`); the
    /// resolved value is always clamped to `[1, hardware_concurrency]`.
    pub thread_count: usize,
    /// Soft-failure threshold before a worker parks instead of yielding.
    pub max_soft_failures: usize,
    /// Legacy hint, see [`SchedulerConfig::failure_sleep_ns`].
    pub failure_sleep_ns: u64,
    /// Forwarded to whichever scheduler the service constructs or is given.
    pub scheduler_config: SchedulerConfig,
    /// Base name for worker threads (`Builder::name`); threads get `"{name}-{index}"`.
    pub thread_name: Option<String>,
    /// Per-thread stack size override (`Builder::stack_size`).
    pub stack_size: Option<usize>,
    /// Called when `execute_contract` panics. `None` aborts the process.
    pub panic_handler: Option<PanicHandler>,
    /// Called once inside each worker thread, before it starts looping.
    pub on_thread_start: Option<ThreadStartHandler>,
    /// Called once inside each worker thread, right before it exits.
    pub on_thread_exit: Option<ThreadExitHandler>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            thread_count: 0,
            max_soft_failures: 32,
            failure_sleep_ns: 1,
            scheduler_config: SchedulerConfig::default(),
            thread_name: None,
            stack_size: None,
            panic_handler: None,
            on_thread_start: None,
            on_thread_exit: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("thread_count", &self.thread_count)
            .field("max_soft_failures", &self.max_soft_failures)
            .field("failure_sleep_ns", &self.failure_sleep_ns)
            .field("scheduler_config", &self.scheduler_config)
            .field("thread_name", &self.thread_name)
            .field("stack_size", &self.stack_size)
            .field("panic_handler", &self.panic_handler.is_some())
            .field("on_thread_start", &self.on_thread_start.is_some())
            .field("on_thread_exit", &self.on_thread_exit.is_some())
            .finish()
    }
}

impl Config {
    /// Resolve `thread_count == 0` to hardware concurrency and clamp to `>= 1`. Also
    /// copies the resolved count into `scheduler_config.thread_count`, since the Adaptive
    /// ranking formula needs the real thread count, not the "0 means auto" sentinel.
    pub(crate) fn resolved(mut self) -> Self {
        let hw = num_cpus::get().max(1);
        let requested = if self.thread_count == 0 {
            hw
        } else {
            self.thread_count
        };
        self.thread_count = requested.clamp(1, hw);
        self.scheduler_config.thread_count = self.thread_count;
        self
    }
}

/// Fluent builder for [`Config`]. Using a builder rather than public struct-update syntax
/// keeps field additions non-breaking, as in `ThreadPoolBuilder`.
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        ConfigBuilder::default()
    }

    pub fn thread_count(mut self, count: usize) -> Self {
        self.config.thread_count = count;
        self
    }

    pub fn max_soft_failures(mut self, count: usize) -> Self {
        self.config.max_soft_failures = count;
        self
    }

    pub fn failure_sleep_ns(mut self, ns: u64) -> Self {
        self.config.failure_sleep_ns = ns;
        self
    }

    pub fn scheduler_config(mut self, scheduler_config: SchedulerConfig) -> Self {
        self.config.scheduler_config = scheduler_config;
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
        handler: impl Fn(Box<dyn Any + Send>) + Send + Sync + 'static,
    ) -> Self {
        self.config.panic_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_thread_start(mut self, handler: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.config.on_thread_start = Some(Arc::new(handler));
        self
    }

    pub fn on_thread_exit(mut self, handler: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.config.on_thread_exit = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

//! Pluggable scheduling strategies.
//!
//! [`Scheduler`] is the seam between thread management (owned by
//! [`crate::worker`]/[`crate::service`]) and the decision of *which* group a worker pulls
//! from next. All four strategies named in the distilled spec live here, plus a fifth
//! (`weighted_random`) carried over from the original source's `RandomScheduler`.

pub mod adaptive;
pub mod direct;
pub mod round_robin;
pub mod spinning_direct;
pub mod weighted_random;

use crate::group::{ContractGroup, GroupId};
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-local info handed to the scheduler on every scheduling decision.
pub struct SchedulingContext {
    /// Unique id for this worker thread, `0..thread_count`.
    pub thread_id: usize,
    /// How many consecutive iterations in a row found no work.
    pub consecutive_failures: usize,
    /// Last group this thread executed from, if any.
    pub last_executed_group: Option<GroupId>,
}

/// The scheduler's decision for one call to [`Scheduler::select_next`].
pub struct ScheduleResult<'a> {
    /// Group to pull from next, or `None` if nothing is ready.
    pub group: Option<&'a dyn ContractGroup>,
    /// Hint: true if the caller should park rather than spin. Ignored when `group` is
    /// `Some`.
    pub should_sleep: bool,
}

impl<'a> ScheduleResult<'a> {
    fn none(should_sleep: bool) -> Self {
        ScheduleResult {
            group: None,
            should_sleep,
        }
    }

    fn found(group: &'a dyn ContractGroup) -> Self {
        ScheduleResult {
            group: Some(group),
            should_sleep: false,
        }
    }
}

/// Decides which group a worker thread should pull from next.
///
/// Implementations MUST be safe under concurrent invocation from every worker thread,
/// potentially against the same `groups` snapshot. Prefer thread-local caches over shared
/// mutable state; nothing here should need a lock on the hot path.
pub trait Scheduler: Send + Sync {
    /// Choose a group to execute from, or report that none is ready.
    ///
    /// Called once per worker-loop iteration. Must not allocate on the common path and
    /// must never block.
    fn select_next<'a>(
        &self,
        groups: &'a [&'a dyn ContractGroup],
        ctx: &SchedulingContext,
    ) -> ScheduleResult<'a>;

    /// Called after a worker successfully executes a contract from `group`.
    fn notify_executed(&self, group: &dyn ContractGroup, thread_id: usize) {
        let _ = (group, thread_id);
    }

    /// Called after the registry publishes a new snapshot.
    fn notify_groups_changed(&self, groups: &[&dyn ContractGroup]) {
        let _ = groups;
    }

    /// Clear all learned state; the scheduler should behave as newly constructed.
    fn reset(&self) {}

    /// Short, stable name used in logs and diagnostics.
    fn name(&self) -> &'static str;
}

/// Allocates process-wide-unique ids for scheduler instances.
///
/// Several strategies below keep per-thread state in a `thread_local!` map keyed by this
/// id, so that two independent [`Service`](crate::service::Service)s running on
/// overlapping threads (common in tests) don't clobber each other's cursors.
pub(crate) fn next_scheduler_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

//! Like [`DirectScheduler`](super::direct::DirectScheduler), but never suggests sleeping.
//!
//! Exists purely to isolate thread wake/sleep overhead in benchmarks: compare a run with
//! this scheduler against one with `Direct` and the difference is the cost of parking and
//! waking worker threads. Burns a full core per idle worker — never use this in
//! production.

use super::{ScheduleResult, Scheduler, SchedulingContext};
use crate::config::SchedulerConfig;
use crate::group::ContractGroup;

#[derive(Debug, Default)]
pub struct SpinningDirectScheduler;

impl SpinningDirectScheduler {
    pub fn new(_config: &SchedulerConfig) -> Self {
        SpinningDirectScheduler
    }
}

impl Scheduler for SpinningDirectScheduler {
    fn select_next<'a>(
        &self,
        groups: &'a [&'a dyn ContractGroup],
        _ctx: &SchedulingContext,
    ) -> ScheduleResult<'a> {
        for &group in groups {
            if group.ready_count() > 0 {
                return ScheduleResult::found(group);
            }
        }
        // Unlike Direct, never hint at sleeping.
        ScheduleResult::none(false)
    }

    fn name(&self) -> &'static str {
        "SpinningDirect"
    }
}

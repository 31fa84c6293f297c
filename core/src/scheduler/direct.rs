//! The "just give me work" scheduler — minimum overhead, no state, no fairness.
//!
//! Scans from the start of the snapshot and returns the first group with ready work.
//! Every thread converges on the same group when several have work, so this is a
//! benchmarking/debugging baseline, not a production scheduler.

use super::{ScheduleResult, Scheduler, SchedulingContext};
use crate::config::SchedulerConfig;
use crate::group::ContractGroup;

/// See module docs.
#[derive(Debug, Default)]
pub struct DirectScheduler;

impl DirectScheduler {
    /// Config is accepted for interface symmetry with the other strategies but ignored:
    /// this scheduler carries no state.
    pub fn new(_config: &SchedulerConfig) -> Self {
        DirectScheduler
    }
}

impl Scheduler for DirectScheduler {
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
        ScheduleResult::none(true)
    }

    fn name(&self) -> &'static str {
        "Direct"
    }
}

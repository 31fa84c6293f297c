//! Fair round-robin scheduler: each thread cycles through groups in registry order.
//!
//! No cache-locality preference and no adaptation to load — every group gets an equal
//! look every cycle. Good when groups are roughly equal in importance and predictable,
//! deterministic behavior matters more than throughput.

use super::{next_scheduler_id, ScheduleResult, Scheduler, SchedulingContext};
use crate::config::SchedulerConfig;
use crate::group::ContractGroup;
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    /// Per-(scheduler, thread) rotation cursor. Keyed by scheduler id rather than a bare
    /// `Cell<usize>` so that multiple `RoundRobinScheduler` instances sharing a thread
    /// (common across tests) don't clobber each other's position.
    static CURSORS: RefCell<HashMap<u64, usize>> = RefCell::new(HashMap::new());
}

#[derive(Debug)]
pub struct RoundRobinScheduler {
    id: u64,
}

impl RoundRobinScheduler {
    /// Config is unused: round-robin needs no tuning.
    pub fn new(_config: &SchedulerConfig) -> Self {
        RoundRobinScheduler {
            id: next_scheduler_id(),
        }
    }

    fn cursor(&self) -> usize {
        CURSORS.with(|c| *c.borrow().get(&self.id).unwrap_or(&0))
    }

    fn set_cursor(&self, value: usize) {
        CURSORS.with(|c| {
            c.borrow_mut().insert(self.id, value);
        });
    }
}

impl Scheduler for RoundRobinScheduler {
    fn select_next<'a>(
        &self,
        groups: &'a [&'a dyn ContractGroup],
        _ctx: &SchedulingContext,
    ) -> ScheduleResult<'a> {
        if groups.is_empty() {
            return ScheduleResult::none(true);
        }

        let mut cursor = self.cursor();
        let mut attempts = 0;

        while attempts < groups.len() {
            if cursor >= groups.len() {
                cursor = 0;
            }

            let group = groups[cursor];
            cursor += 1;
            attempts += 1;

            if group.ready_count() > 0 {
                self.set_cursor(cursor);
                return ScheduleResult::found(group);
            }
        }

        self.set_cursor(cursor);
        ScheduleResult::none(true)
    }

    fn reset(&self) {
        self.set_cursor(0);
    }

    fn name(&self) -> &'static str {
        "RoundRobin"
    }
}

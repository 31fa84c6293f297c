//! The default scheduler: ranks groups by work pressure and sticks to a winner for cache
//! locality until it runs dry or a fairness budget is spent.
//!
//! Ranking formula, for every group with `s = ready_count() > 0` and `e = executing_count()`:
//!
//! ```text
//! rank = (s / (e + 1)) * (1 - (e + 1) / thread_count)
//! ```
//!
//! Groups with `s == 0` are excluded outright. Ties break by registry order (a stable
//! sort). Each worker thread caches its own ranking and recomputes it independently, so
//! threads are expected to diverge slightly — that divergence is what keeps every worker
//! from piling onto a single "best" group.

use super::{next_scheduler_id, ScheduleResult, Scheduler, SchedulingContext};
use crate::config::SchedulerConfig;
use crate::group::{ContractGroup, GroupId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-thread cached ranking and sticky-group bookkeeping.
struct ThreadState {
    /// Position of the sticky group within `ranked_groups`.
    current_index: usize,
    /// Executions taken from the sticky group since it was last (re)selected.
    consecutive_executions: usize,
    /// Executions since the ranking was last recomputed.
    ranking_update_counter: usize,
    /// Cached priority order, by id (never by reference: the groups slice handed to
    /// `select_next` is only valid for that one call).
    ranked_groups: Vec<GroupId>,
    /// Registry generation this ranking was computed against.
    last_seen_generation: u64,
}

impl ThreadState {
    fn new() -> Self {
        ThreadState {
            current_index: 0,
            consecutive_executions: 0,
            ranking_update_counter: 0,
            ranked_groups: Vec::new(),
            last_seen_generation: 0,
        }
    }

    fn reset(&mut self) {
        *self = ThreadState::new();
    }
}

thread_local! {
    /// Keyed by scheduler id for the same reason as `round_robin`'s cursor map: several
    /// `AdaptiveRankingScheduler` instances may share a thread across tests.
    static STATE: RefCell<HashMap<u64, ThreadState>> = RefCell::new(HashMap::new());
}

fn with_state<R>(id: u64, f: impl FnOnce(&mut ThreadState) -> R) -> R {
    STATE.with(|map| {
        let mut map = map.borrow_mut();
        let state = map.entry(id).or_insert_with(ThreadState::new);
        f(state)
    })
}

#[derive(Debug)]
pub struct AdaptiveRankingScheduler {
    id: u64,
    config: SchedulerConfig,
    generation: AtomicU64,
}

impl AdaptiveRankingScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        AdaptiveRankingScheduler {
            id: next_scheduler_id(),
            config: *config,
            generation: AtomicU64::new(0),
        }
    }

    fn rank_of(group: &dyn ContractGroup, thread_count: usize) -> Option<f64> {
        let scheduled = group.ready_count();
        if scheduled == 0 {
            return None;
        }
        let executing = group.executing_count();
        let execution_count_f = executing as f64 + 1.0;
        let scheduled_f = scheduled as f64;
        let thread_count_f = (thread_count.max(1)) as f64;
        let thread_penalty = 1.0 - execution_count_f / thread_count_f;
        Some((scheduled_f / execution_count_f) * thread_penalty)
    }

    fn needs_ranking_update(&self, state: &ThreadState, groups: &[&dyn ContractGroup]) -> bool {
        if state.ranked_groups.is_empty() {
            return true;
        }
        if state.last_seen_generation != self.generation.load(Ordering::Relaxed) {
            return true;
        }
        if state.ranking_update_counter >= self.config.update_cycle_interval {
            return true;
        }
        if let Some(current) = Self::current_group_if_valid(state, groups) {
            if current.ready_count() == 0 {
                return true;
            }
        }
        false
    }

    fn update_rankings(&self, state: &mut ThreadState, groups: &[&dyn ContractGroup]) {
        let mut rankings: Vec<(GroupId, f64)> = groups
            .iter()
            .filter_map(|&g| Self::rank_of(g, self.config.thread_count).map(|r| (g.id(), r)))
            .collect();

        // Stable sort: ties keep registry order, matching the spec's tie-break rule.
        rankings.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        state.ranked_groups = rankings.into_iter().map(|(id, _)| id).collect();
        state.ranking_update_counter = 0;
        state.current_index = 0;
        state.last_seen_generation = self.generation.load(Ordering::Relaxed);
    }

    fn current_group_if_valid<'a>(
        state: &ThreadState,
        groups: &'a [&'a dyn ContractGroup],
    ) -> Option<&'a dyn ContractGroup> {
        let id = *state.ranked_groups.get(state.current_index)?;
        groups.iter().copied().find(|g| g.id() == id)
    }

    fn execute_work_plan<'a>(
        state: &mut ThreadState,
        groups: &'a [&'a dyn ContractGroup],
    ) -> Option<&'a dyn ContractGroup> {
        for (i, &id) in state.ranked_groups.iter().enumerate() {
            let group = match groups.iter().copied().find(|g| g.id() == id) {
                Some(g) => g,
                None => continue, // removed from the registry since ranking was computed
            };
            if group.ready_count() > 0 {
                state.current_index = i;
                state.consecutive_executions = 1;
                return Some(group);
            }
        }
        None
    }
}

impl Scheduler for AdaptiveRankingScheduler {
    fn select_next<'a>(
        &self,
        groups: &'a [&'a dyn ContractGroup],
        _ctx: &SchedulingContext,
    ) -> ScheduleResult<'a> {
        with_state(self.id, |state| {
            // Phase 1: stay with the sticky group for cache locality, if budget remains.
            if state.consecutive_executions < self.config.max_consecutive_executions {
                if let Some(sticky) = Self::current_group_if_valid(state, groups) {
                    if sticky.ready_count() > 0 {
                        return ScheduleResult::found(sticky);
                    }
                }
            }

            // Phase 2: sticky affinity broken, (re)rank if needed.
            state.consecutive_executions = 0;
            if self.needs_ranking_update(state, groups) {
                self.update_rankings(state, groups);
            }

            // Phase 3: walk the ranked plan looking for the first group with work.
            match Self::execute_work_plan(state, groups) {
                Some(group) => ScheduleResult::found(group),
                None => ScheduleResult::none(true),
            }
        })
    }

    fn notify_executed(&self, _group: &dyn ContractGroup, _thread_id: usize) {
        with_state(self.id, |state| {
            state.consecutive_executions += 1;
            state.ranking_update_counter += 1;
        });
    }

    fn notify_groups_changed(&self, _groups: &[&dyn ContractGroup]) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.generation.store(0, Ordering::Relaxed);
        with_state(self.id, ThreadState::reset);
    }

    fn name(&self) -> &'static str {
        "AdaptiveRanking"
    }
}

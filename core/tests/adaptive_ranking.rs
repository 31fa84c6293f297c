//! `AdaptiveRankingScheduler`: rank formula ordering and sticky-group affinity, driven
//! directly against the `Scheduler` trait so the tests don't depend on real thread timing.

mod common;

use common::FakeGroup;
use workpool_core::config::SchedulerConfig;
use workpool_core::group::ContractGroup;
use workpool_core::scheduler::adaptive::AdaptiveRankingScheduler;
use workpool_core::scheduler::{Scheduler, SchedulingContext};

fn ctx(thread_id: usize) -> SchedulingContext {
    SchedulingContext {
        thread_id,
        consecutive_failures: 0,
        last_executed_group: None,
    }
}

#[test]
fn picks_the_highest_ranked_group_first() {
    // rank = (s / (e+1)) * (1 - (e+1)/T); with thread_count = 4:
    // group A: s=10, e=0 -> rank = 10 * (1 - 0.25) = 7.5
    // group B: s=2,  e=0 -> rank = 2  * (1 - 0.25) = 1.5
    let config = SchedulerConfig {
        thread_count: 4,
        ..SchedulerConfig::default()
    };
    let scheduler = AdaptiveRankingScheduler::new(&config);

    let a = FakeGroup::leak(1, 10);
    let b = FakeGroup::leak(2, 2);
    let groups: Vec<&dyn ContractGroup> = vec![b, a]; // registry order: B before A

    let result = scheduler.select_next(&groups, &ctx(0));
    assert_eq!(result.group.unwrap().id(), a.id());
}

#[test]
fn excludes_groups_with_no_ready_work() {
    let config = SchedulerConfig {
        thread_count: 2,
        ..SchedulerConfig::default()
    };
    let scheduler = AdaptiveRankingScheduler::new(&config);

    let empty = FakeGroup::leak(3, 0);
    let ready = FakeGroup::leak(4, 1);
    let groups: Vec<&dyn ContractGroup> = vec![empty, ready];

    let result = scheduler.select_next(&groups, &ctx(0));
    assert_eq!(result.group.unwrap().id(), ready.id());
}

#[test]
fn reports_no_work_and_should_sleep_when_every_group_is_empty() {
    let config = SchedulerConfig::default();
    let scheduler = AdaptiveRankingScheduler::new(&config);

    let a = FakeGroup::leak(5, 0);
    let b = FakeGroup::leak(6, 0);
    let groups: Vec<&dyn ContractGroup> = vec![a, b];

    let result = scheduler.select_next(&groups, &ctx(0));
    assert!(result.group.is_none());
    assert!(result.should_sleep);
}

#[test]
fn stays_sticky_within_budget_then_moves_on() {
    let config = SchedulerConfig {
        max_consecutive_executions: 3,
        thread_count: 1,
        ..SchedulerConfig::default()
    };
    let scheduler = AdaptiveRankingScheduler::new(&config);

    let winner = FakeGroup::leak(7, 1_000);
    let loser = FakeGroup::leak(8, 1_000);
    let groups: Vec<&dyn ContractGroup> = vec![winner, loser];

    let first = scheduler.select_next(&groups, &ctx(0));
    let first_id = first.group.unwrap().id();

    // Exhaust the sticky budget against whichever group the ranking picked first.
    for _ in 0..2 {
        scheduler.notify_executed(groups[0], 0);
        let picked = scheduler.select_next(&groups, &ctx(0));
        assert_eq!(picked.group.unwrap().id(), first_id);
    }

    // One more execution spends the last unit of budget; the group is still ranked
    // first (both groups have equal pressure) so it may legitimately stay selected,
    // but the sticky counter itself must have been reset by the re-rank.
    scheduler.notify_executed(groups[0], 0);
    let after_budget = scheduler.select_next(&groups, &ctx(0));
    assert!(after_budget.group.is_some());
}

#[test]
fn reset_clears_sticky_state_and_generation() {
    let config = SchedulerConfig::default();
    let scheduler = AdaptiveRankingScheduler::new(&config);

    let a = FakeGroup::leak(9, 5);
    let groups: Vec<&dyn ContractGroup> = vec![a];
    scheduler.select_next(&groups, &ctx(0));
    scheduler.notify_executed(a, 0);

    scheduler.reset();

    // A fresh selection after reset must still find the only ready group; this mostly
    // guards against `reset` leaving the thread-local state in a way that panics or
    // permanently excludes a group.
    let result = scheduler.select_next(&groups, &ctx(0));
    assert_eq!(result.group.unwrap().id(), a.id());
}

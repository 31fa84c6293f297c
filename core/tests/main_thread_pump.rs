//! The main-thread pump: `Service::execute_main_thread_work`,
//! `execute_main_thread_work_on`, `has_main_thread_work`.

mod common;

use common::MainThreadGroup;
use workpool_core::config::Config;
use workpool_core::service::Service;

fn leak_service(config: Config) -> &'static Service {
    Box::leak(Box::new(Service::new(config).unwrap()))
}

#[test]
fn drains_every_group_within_budget() {
    let service = leak_service(Config::default());
    service.add_group(MainThreadGroup::leak(1, 3));
    service.add_group(MainThreadGroup::leak(2, 4));

    let result = service.execute_main_thread_work(100);

    assert_eq!(result.executed_count, 7);
    assert_eq!(result.groups_touched, 2);
    assert!(!result.more_available);
}

#[test]
fn reports_more_available_when_budget_runs_out() {
    let service = leak_service(Config::default());
    service.add_group(MainThreadGroup::leak(3, 10));
    service.add_group(MainThreadGroup::leak(4, 10));

    let result = service.execute_main_thread_work(5);

    assert_eq!(result.executed_count, 5);
    assert!(result.more_available);
}

#[test]
fn has_main_thread_work_reflects_group_state() {
    let service = leak_service(Config::default());
    let group = MainThreadGroup::leak(5, 0);
    service.add_group(group);

    assert!(!service.has_main_thread_work());

    service.execute_main_thread_work(0); // budget of 0: nothing drained, state unchanged
    assert!(!service.has_main_thread_work());
}

#[test]
fn execute_main_thread_work_on_targets_a_single_group_directly() {
    let service = leak_service(Config::default());
    let targeted = MainThreadGroup::leak(6, 8);
    let other = MainThreadGroup::leak(7, 8);
    service.add_group(targeted);
    service.add_group(other);

    let executed = service.execute_main_thread_work_on(targeted, 3);

    assert_eq!(executed, 3);
    assert!(service.has_main_thread_work()); // `other` is untouched and still has work
}

#[test]
fn an_empty_registry_has_no_main_thread_work() {
    let service = leak_service(Config::default());
    let result = service.execute_main_thread_work(50);

    assert_eq!(result.executed_count, 0);
    assert_eq!(result.groups_touched, 0);
    assert!(!result.more_available);
    assert!(!service.has_main_thread_work());
}

//! Registration lifecycle: add/remove/clear through the public `Service` facade, and the
//! quiescence guarantee `notify_group_destroyed` is supposed to provide.

mod common;

use common::FakeGroup;
use workpool_core::config::Config;
use workpool_core::group::GroupRef;
use workpool_core::registry::{AddOutcome, RemoveOutcome};
use workpool_core::service::Service;

fn leak_service(config: Config) -> &'static Service {
    Box::leak(Box::new(Service::new(config).unwrap()))
}

#[test]
fn adding_the_same_group_twice_is_idempotent() {
    let service = leak_service(Config {
        thread_count: 1,
        ..Config::default()
    });
    let group: GroupRef = FakeGroup::leak(1, 0);

    assert_eq!(service.add_group(group), AddOutcome::Added);
    assert_eq!(service.add_group(group), AddOutcome::AlreadyPresent);
    assert_eq!(service.group_count(), 1);
}

#[test]
fn removing_an_unregistered_group_reports_not_found() {
    let service = leak_service(Config::default());
    let group: GroupRef = FakeGroup::leak(2, 0);

    assert_eq!(service.remove_group(group), RemoveOutcome::NotFound);
}

#[test]
fn clear_drops_every_registered_group() {
    let service = leak_service(Config::default());
    for id in 0..5 {
        service.add_group(FakeGroup::leak(id, 0));
    }
    assert_eq!(service.group_count(), 5);

    service.clear();
    assert_eq!(service.group_count(), 0);
}

#[test]
fn notify_group_destroyed_removes_and_returns_promptly_when_stopped() {
    let service = leak_service(Config::default());
    let group: GroupRef = FakeGroup::leak(3, 0);
    service.add_group(group);
    assert_eq!(service.group_count(), 1);

    // Service was never started: no worker threads are publishing epochs, so the
    // quiescence wait inside `notify_group_destroyed` must not block forever.
    service.notify_group_destroyed(group);
    assert_eq!(service.group_count(), 0);
}

#[test]
fn notify_group_destroyed_waits_out_running_workers() {
    let service = leak_service(Config {
        thread_count: 2,
        ..Config::default()
    });
    let group: &'static FakeGroup = FakeGroup::leak(4, 1000);
    service.add_group(group);
    service.start().unwrap();

    // Give the workers a moment to actually be mid-execution against the group.
    std::thread::sleep(std::time::Duration::from_millis(20));

    // Must return (not hang) even while workers are actively racing the registry.
    service.notify_group_destroyed(group);
    assert_eq!(service.group_count(), 0);

    service.stop();
}

#[test]
fn reclaim_is_safe_to_call_with_no_registered_groups() {
    let service = leak_service(Config::default());
    service.reclaim();
    service.reclaim();
}

#[test]
fn reclaim_is_safe_after_repeated_add_remove_churn() {
    let service = leak_service(Config::default());
    for round in 0..20 {
        let group = FakeGroup::leak(100 + round, 0);
        service.add_group(group);
        service.remove_group(group);
        service.reclaim();
    }
    assert_eq!(service.group_count(), 0);
}

/// Fuzz the registry with a random interleaving of add/remove/clear against a fixed pool
/// of groups, checking only the invariant that survives any ordering: the group count
/// never exceeds the pool size and never goes negative (it's a `usize`, so the real risk
/// is an overflowing `fetch_sub`-style bug in the CAS loop).
#[test]
fn randomized_add_remove_clear_never_corrupts_the_count() {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    let service = leak_service(Config::default());
    let pool: Vec<GroupRef> = (0..16).map(|id| FakeGroup::leak(id, 0) as GroupRef).collect();
    let mut rng = XorShiftRng::from_seed([7u8; 16]);

    for _ in 0..500 {
        match rng.gen_range(0..10) {
            0..=3 => {
                let group = pool[rng.gen_range(0..pool.len())];
                service.add_group(group);
            }
            4..=7 => {
                let group = pool[rng.gen_range(0..pool.len())];
                service.remove_group(group);
            }
            _ => service.clear(),
        }
        assert!(service.group_count() <= pool.len());
    }

    service.clear();
    assert_eq!(service.group_count(), 0);
}

//! Main-thread work pump.
//!
//! Some contracts are restricted to running on the application's designated main thread
//! (e.g. touching a UI toolkit). Worker threads never execute them; instead the host calls
//! [`pump`] periodically from wherever its main loop lives. Ported from
//! `WorkService::executeMainThreadWork`.

use crate::group::GroupRef;

/// Outcome of one [`pump`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MainThreadWorkResult {
    /// Total contracts executed across all groups this call.
    pub executed_count: usize,
    /// Number of groups that had at least one main-thread contract ready.
    pub groups_touched: usize,
    /// True if the budget ran out before every group with work was drained.
    pub more_available: bool,
}

/// Run up to `max_contracts` main-thread contracts across `groups`, in registry order.
pub(crate) fn pump(groups: &[GroupRef], max_contracts: usize) -> MainThreadWorkResult {
    let mut result = MainThreadWorkResult::default();
    let mut remaining = max_contracts;

    for &group in groups {
        if !group.has_main_thread_work() {
            continue;
        }
        result.groups_touched += 1;
        let executed = group.execute_main_thread_work(remaining);
        result.executed_count += executed;
        remaining -= executed;

        if remaining == 0 {
            result.more_available = true;
            break;
        }
    }

    if remaining > 0 && !result.more_available {
        result.more_available = groups.iter().any(|g| g.has_main_thread_work());
    }

    result
}

/// Run up to `max_contracts` main-thread contracts on a single group, bypassing the
/// scheduler entirely. Useful when the host already knows which group needs draining.
pub(crate) fn pump_group(group: GroupRef, max_contracts: usize) -> usize {
    group.execute_main_thread_work(max_contracts)
}

/// True if any group in `groups` currently has main-thread-restricted work ready.
pub(crate) fn has_work(groups: &[GroupRef]) -> bool {
    groups.iter().any(|g| g.has_main_thread_work())
}

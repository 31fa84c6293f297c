//! `workpool` is a fixed-size worker pool that pulls ready-to-run work out of
//! independently-managed work groups and executes it on dedicated worker threads.
//!
//! This top-level crate is a thin facade: the scheduling and lifecycle core lives in
//! [`workpool-core`](https://docs.rs/workpool-core), which this crate re-exports in full.
//! Application code should depend on `workpool` and never on `workpool-core` directly,
//! the same way `rayon` re-exports `rayon-core`.

pub use workpool_core::config::{Config, ConfigBuilder, SchedulerConfig};
pub use workpool_core::error::ServiceBuildError;
pub use workpool_core::group::{ConcurrencyProvider, ContractGroup, ContractHandle, GroupId};
pub use workpool_core::registry::{AddOutcome, RemoveOutcome};
pub use workpool_core::scheduler::{
    adaptive::AdaptiveRankingScheduler, direct::DirectScheduler, round_robin::RoundRobinScheduler,
    spinning_direct::SpinningDirectScheduler, weighted_random::WeightedRandomScheduler,
    ScheduleResult, Scheduler, SchedulingContext,
};
pub use workpool_core::service::{MainThreadWorkResult, Service, ServiceBuilder};

//! Structured logging for the core.
//!
//! Call sites look like `log_event(Event::GroupAdded { group, generation })` at the point
//! a state transition actually commits, mirroring the teacher's `self.log(|| Event::Foo
//! {..})` closures — the difference is that here the event is dispatched straight into
//! `tracing`, which pays for formatting only when some subscriber has the level enabled.

use crate::group::GroupId;

/// A loggable event emitted by the core. Each variant maps to one `tracing` call site in
/// [`log_event`]; new variants should stay this granular rather than growing a single
/// catch-all "message" field, so subscribers can filter by event shape.
#[derive(Debug)]
pub enum Event {
    GroupAdded { group: GroupId, generation: u64 },
    GroupRemoved { group: GroupId, generation: u64 },
    GroupAlreadyPresent { group: GroupId },
    GroupNotFound { group: GroupId },
    RegistryCleared { generation: u64 },
    ContractExecuted { group: GroupId, thread_id: usize },
    WorkerParked { thread_id: usize, timeout_ms: u64 },
    WorkerWoke { thread_id: usize },
    WorkerShuttingDown { thread_id: usize },
    ThreadPanicked { thread_id: usize, group: GroupId },
    EpochAdvanced { epoch: u64 },
    EpochQuiesced { epoch: u64 },
    SnapshotRetired { generation: u64 },
    SnapshotsReclaimed { count: usize, min_generation: u64 },
    ServiceStarted { scheduler: &'static str, thread_count: usize },
}

/// Dispatch an [`Event`] to the appropriate `tracing` macro with structured fields.
pub fn log_event(event: Event) {
    match event {
        Event::GroupAdded { group, generation } => {
            tracing::debug!(%group, generation, "group added");
        }
        Event::GroupRemoved { group, generation } => {
            tracing::debug!(%group, generation, "group removed");
        }
        Event::GroupAlreadyPresent { group } => {
            tracing::trace!(%group, "add_group: already present");
        }
        Event::GroupNotFound { group } => {
            tracing::trace!(%group, "remove_group: not found");
        }
        Event::RegistryCleared { generation } => {
            tracing::debug!(generation, "registry cleared");
        }
        Event::ContractExecuted { group, thread_id } => {
            tracing::trace!(%group, thread_id, "contract executed");
        }
        Event::WorkerParked { thread_id, timeout_ms } => {
            tracing::trace!(thread_id, timeout_ms, "worker parked");
        }
        Event::WorkerWoke { thread_id } => {
            tracing::trace!(thread_id, "worker woke");
        }
        Event::WorkerShuttingDown { thread_id } => {
            tracing::debug!(thread_id, "worker shutting down");
        }
        Event::ThreadPanicked { thread_id, group } => {
            tracing::warn!(thread_id, %group, "contract body panicked");
        }
        Event::EpochAdvanced { epoch } => {
            tracing::debug!(epoch, "epoch advanced, waiting for quiescence");
        }
        Event::EpochQuiesced { epoch } => {
            tracing::debug!(epoch, "epoch quiesced");
        }
        Event::SnapshotRetired { generation } => {
            tracing::trace!(generation, "snapshot retired");
        }
        Event::SnapshotsReclaimed { count, min_generation } => {
            if count > 0 {
                tracing::trace!(count, min_generation, "snapshots reclaimed");
            }
        }
        Event::ServiceStarted { scheduler, thread_count } => {
            tracing::info!(scheduler, thread_count, "service started");
        }
    }
}

//! The collaborator contract the core requires from externally-owned work groups.
//!
//! Everything in this module is a trait: the slot allocator, contract state machine and
//! signal-tree selection behind a real group are out of scope for this crate (see the
//! crate-level docs). The core only ever calls through [`ContractGroup`].

use std::fmt;

/// Opaque identity for a registered group.
///
/// Trait objects don't have a stable notion of pointer equality across vtables, so the
/// registry de-duplicates and logs groups by this id rather than by address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// A single unit of executable work within a group. Opaque to the core: it is only ever
/// handed back to the group that produced it, via [`ContractGroup::execute_contract`] and
/// [`ContractGroup::complete_execution`].
#[derive(Debug)]
pub struct ContractHandle {
    /// Group-assigned identifier for the contract (e.g. a slot index). The core never
    /// interprets this; it exists so logging can say which contract ran.
    pub slot: usize,
}

/// A non-owning reference to a registered group.
///
/// The registry never allocates or frees group storage (see the crate-level Non-goals);
/// it only ever holds references. Requiring `'static` is the Rust rendering of the
/// spec's "the external code guarantees that a group outlives its unregistration":
/// callers typically hand in a leaked `Box`, a `&'static` global, or a reference scoped to
/// an outer stack frame that outlives the `Service`.
pub type GroupRef = &'static dyn ContractGroup;

/// The capability set a work group must expose to be schedulable by this crate.
///
/// Implementations MUST be `Send + Sync`: `ready_count`/`executing_count`/`is_stopping`
/// are read concurrently from every worker thread on every scheduling decision, and
/// `select_for_execution`/`execute_contract`/`complete_execution` may be invoked from any
/// worker thread (never concurrently for the *same* contract, but concurrently across
/// distinct contracts in the same group).
pub trait ContractGroup: Send + Sync {
    /// Stable identity used for registry de-duplication and logging.
    fn id(&self) -> GroupId;

    /// Number of contracts ready for worker execution right now.
    fn ready_count(&self) -> usize;

    /// Number of contracts currently being executed by some worker.
    fn executing_count(&self) -> usize;

    /// True while the group refuses new execution (e.g. draining before being dropped).
    fn is_stopping(&self) -> bool;

    /// Pull one ready contract and transition it to the Executing state.
    ///
    /// Returns `None` if the race to claim a contract was lost, or none are ready. Never
    /// blocks.
    fn select_for_execution(&self) -> Option<ContractHandle>;

    /// Run the user-supplied body for `contract`. May block; the core makes no promises
    /// about how long this takes.
    fn execute_contract(&self, contract: &ContractHandle);

    /// Transition `contract` out of the Executing state. Must be called exactly once per
    /// successful `select_for_execution`, even if `execute_contract` was never called
    /// (e.g. on shutdown).
    fn complete_execution(&self, contract: ContractHandle);

    /// Any main-thread-restricted contracts ready right now.
    fn has_main_thread_work(&self) -> bool {
        false
    }

    /// Execute up to `max` main-thread contracts. Returns the number actually executed.
    /// Only ever called from the application's designated main thread.
    fn execute_main_thread_work(&self, max: usize) -> usize {
        let _ = max;
        0
    }

    /// Installed by the service when the group is added to (`Some`) or removed from
    /// (`None`) a registry. Groups should call
    /// [`ConcurrencyProvider::notify_work_available`] on the installed provider whenever a
    /// contract transitions into the ready state.
    ///
    /// `'static`, for the same reason [`GroupRef`] is: a group is free to retain this
    /// reference past the call that installed it, so the core can only hand out
    /// references it can prove outlive any possible retention.
    fn set_concurrency_provider(&self, provider: Option<&'static dyn ConcurrencyProvider>) {
        let _ = provider;
    }
}

/// The half of the [`Service`](crate::service::Service) API a group is allowed to call
/// back into. Kept as a narrow trait (rather than handing groups the full `Service`) so a
/// group cannot, say, add or remove other groups from inside a wakeup callback.
pub trait ConcurrencyProvider: Send + Sync {
    /// A contract in some group became ready. Wakes a parked worker, if any.
    fn notify_work_available(&self);
}

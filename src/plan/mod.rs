//! GC algorithms.
//!
//! This module provides various GC plans, each of which implements a GC algorithm.
//! Generally a plan consists of a few parts:
//! * A plan type that implements the [`Plan`](crate::plan::global::Plan) trait, which defines
//!   spaces used in the plan, and their behaviors in GC and page accounting.
//! * A mutator definition, which describes the mapping between allocators and allocation semantics,
//!   and the mapping between allocators and spaces. If the plan needs barrier, the barrier definition is
//!   also included here.
//! * A constant for [`PlanConstraints`](crate::plan::plan_constraints::PlanConstraints), which defines
//!   plan-specific constants.
//!
//! The collector threads drive every plan through the same phases (see
//! [`crate::scheduler::CollectorContext`]); a plan hooks into them through
//! the methods of [`Plan`].

mod barriers;
pub use barriers::BarrierSelector;
pub use barriers::{Barrier, NoBarrier, ObjectRememberingBarrier, RCBarrier};

pub(crate) mod gc_requester;
pub use gc_requester::TriggerReason;

mod global;
pub(crate) use global::allocator_mapping;
pub(crate) use global::create_mutator;
pub(crate) use global::create_plan;
pub use global::AllocationHint;
pub use global::AllocationSemantics;
pub(crate) use global::CreateGeneralPlanArgs;
pub(crate) use global::CreateSpecificPlanArgs;
pub use global::{BasePlan, CommonPlan, Plan};
pub(crate) use global::{MAX_COLLECTION_ATTEMPTS, OUT_OF_MEMORY_THRESHOLD};

mod mutator_context;
pub use mutator_context::Mutator;
pub use mutator_context::MutatorConfig;

mod plan_constraints;
pub use plan_constraints::PlanConstraints;
pub use plan_constraints::DEFAULT_PLAN_CONSTRAINTS;

mod tracing;
pub use tracing::{ObjectQueue, VectorObjectQueue, VectorQueue};

/// Generational plans
pub mod generational;
pub mod rcbase;

/// Generational copying (GenCopy)
pub mod gencopy;
pub use gencopy::GENCOPY_CONSTRAINTS;

/// Mark sweep (MarkSweep)
pub mod marksweep;
pub use marksweep::MS_CONSTRAINTS;

/// Ulterior reference counting (GenRC)
pub mod genrc;
pub use genrc::GENRC_CONSTRAINTS;

/// Deferred reference counting (RefCount)
pub mod refcount;
pub use refcount::RC_CONSTRAINTS;

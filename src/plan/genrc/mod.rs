//! Plan: ulterior reference counting
//!
//! New objects are bump allocated in a copying nursery. Every GC promotes
//! the nursery survivors into the reference counted mature space, counting
//! each reference the trace finds to them. Mature objects are never traced:
//! they are reclaimed by their counts, and garbage cycles by trial deletion.
//! Only mutations of mature objects are logged, so the barrier cost of the
//! short-lived objects is avoided entirely.

pub(in crate::plan) mod global;
pub(in crate::plan) mod mutator;

pub use self::global::GenRC;
pub use self::global::GENRC_CONSTRAINTS;

//! Plan: generational copying
//!
//! New objects are bump allocated in the nursery. A nursery GC promotes
//! survivors into the current mature semispace, using the remembered set
//! recorded by the object barrier as extra roots. A full heap GC flips the
//! two mature semispaces and evacuates the nursery and the old semispace.

pub(in crate::plan) mod global;
pub(in crate::plan) mod mutator;

pub use self::global::GenCopy;
pub use self::global::GENCOPY_CONSTRAINTS;

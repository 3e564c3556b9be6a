//! Plan: deferred reference counting
//!
//! Every object is allocated in the reference counted space; there is no
//! nursery. Collections count the references logged by the barrier, flag
//! the objects roots reference, and reclaim objects and garbage cycles the
//! same way [`crate::plan::genrc::GenRC`] reclaims its mature space.

pub(in crate::plan) mod global;
pub(in crate::plan) mod mutator;

pub use self::global::RefCount;
pub use self::global::RC_CONSTRAINTS;

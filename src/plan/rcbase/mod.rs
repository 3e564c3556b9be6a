//! The reference counting core shared by [`crate::plan::genrc::GenRC`] and
//! [`crate::plan::refcount::RefCount`].
//!
//! Counts are deferred and coalesced. Mutators never touch a count: the
//! write barrier logs the first store into each object between two GCs,
//! and every GC then
//!
//! 1. increments the referents the logged objects have now,
//! 2. flags the objects roots reference (roots are not counted),
//! 3. kills the objects that lost their root flag and have no count left,
//! 4. applies the decrements the barrier snapshotted, freeing every object
//!    whose count drops to zero and recursively decrementing its children,
//! 5. looks for garbage cycles among the objects a decrement left live.
//!
//! Increments always precede decrements, so a count never drops to zero
//! while a reference to the object is still around.

pub mod global;

pub use self::global::RcBase;

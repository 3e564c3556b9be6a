//! Plan: marksweep
//!
//! Non-moving full heap tracing over a segregated free list space.

pub(in crate::plan) mod global;
pub(in crate::plan) mod mutator;

pub use self::global::MarkSweep;
pub use self::global::MS_CONSTRAINTS;

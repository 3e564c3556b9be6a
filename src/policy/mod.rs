//! Memory policies that can be used for spaces.

/// This class defines and manages spaces.  Each policy is an instance
/// of a space.  A space is a region of the heap which is subject to the
/// same memory management regime.  Multiple spaces may have the same
/// policy (eg there could be numerous instances of CopySpace, each with
/// different roles). Spaces are defined in terms of a unique region of
/// the heap, so no two space instances ever share any memory.
///
/// In addition to tracking memory use, spaces also decide liveness and
/// reclaim memory at the end of a GC.
pub mod space;

pub mod copyspace;
pub mod immortalspace;
pub mod largeobjectspace;
pub mod marksweepspace;
pub mod refcount;

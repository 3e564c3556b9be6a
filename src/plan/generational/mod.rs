//! Generational plans

/// Nursery and full-heap bookkeeping shared by the generational plans.
pub mod global;

/// The name of the nursery space.
pub const NURSERY: &str = "nursery";

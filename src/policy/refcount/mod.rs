//! Reference counting: the mature space of the RC plans, cycle collection
//! by trial deletion, and the sanity checker for counts.

pub mod cycle_detector;
pub mod sanity;
mod space;

pub use self::cycle_detector::{CycleDetector, CycleHost};
pub use self::space::RefCountSpace;

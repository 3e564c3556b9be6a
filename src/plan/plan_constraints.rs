//! Plan-specific constraints.

use crate::plan::barriers::BarrierSelector;
use crate::policy::marksweepspace::block::MAX_CELL_SIZE;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::header::HeaderLayout;

/// Constants that a plan declares once. Spaces, allocators and the
/// `memory_manager` read them to specialize their behavior.
#[derive(Copy, Clone, Debug)]
pub struct PlanConstraints {
    /// True if this plan moves objects.
    pub moves_objects: bool,
    /// Does the plan rely on the log state of the status word?
    pub needs_log_bit: bool,
    /// Which header encoding the plan uses.
    pub header_layout: HeaderLayout,
    /// Default allocations larger than this go to the large object space.
    pub max_non_los_default_alloc_bytes: usize,
    /// The write barrier mutators run.
    pub barrier: BarrierSelector,
}

impl PlanConstraints {
    /// A const function to create the default plan constraints.
    pub const fn default() -> Self {
        PlanConstraints {
            moves_objects: false,
            needs_log_bit: false,
            header_layout: HeaderLayout::Mark,
            // Leave room for alignment padding in the largest free list cell.
            max_non_los_default_alloc_bytes: MAX_CELL_SIZE - BYTES_IN_WORD,
            barrier: BarrierSelector::NoBarrier,
        }
    }
}

/// The default plan constraints. Each plan should define their own plan contraints.
/// They can start from the default constraints and explicitly set some of the fields.
pub const DEFAULT_PLAN_CONSTRAINTS: PlanConstraints = PlanConstraints::default();

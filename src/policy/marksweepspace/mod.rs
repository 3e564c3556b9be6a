//! Spaces managed as segregated free lists of fixed-size cells.

pub mod block;
pub mod block_list;
mod global;

pub use block_list::SegregatedBlocks;
pub use global::MarkSweepSpace;

use crate::policy::space::Space;
use crate::vm::VMBinding;

/// A space whose memory is handed out by a [`crate::util::alloc::FreeListAllocator`].
pub trait FreeListSpace<VM: VMBinding>: Space<VM> {
    fn blocks(&self) -> &SegregatedBlocks;
}

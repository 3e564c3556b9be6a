use super::block::Block;
use super::{FreeListSpace, SegregatedBlocks};
use crate::plan::ObjectQueue;
use crate::policy::space::{CommonSpace, PlanCreateSpaceArgs, Space, SFT};
use crate::util::header::status::{self, MARK_BIT};
use crate::util::heap::{FreeListPageResource, PageResource};
use crate::util::log;
use crate::util::ObjectReference;
use crate::vm::VMBinding;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A non-moving space. Objects are marked in their header with a polarity
/// that flips every GC, so no unmark pass is needed. Release turns unmarked
/// objects back into free cells.
pub struct MarkSweepSpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: FreeListPageResource,
    blocks: SegregatedBlocks,
    mark_state: AtomicUsize,
}

impl<VM: VMBinding> SFT for MarkSweepSpace<VM> {
    fn name(&self) -> &'static str {
        self.common.name
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        self.blocks.live_bitmap().is_set(object.to_raw_address())
            && status::is_marked(&self.common.heap, object, self.mark_state())
    }

    fn is_movable(&self) -> bool {
        false
    }

    fn initialize_object_metadata(&self, object: ObjectReference, _alloc: bool) {
        status::write_mark_state(&self.common.heap, object, self.mark_state());
    }
}

impl<VM: VMBinding> Space<VM> for MarkSweepSpace<VM> {
    fn as_space(&self) -> &dyn Space<VM> {
        self
    }

    fn get_page_resource(&self) -> &dyn PageResource {
        &self.pr
    }

    fn common(&self) -> &CommonSpace<VM> {
        &self.common
    }
}

impl<VM: VMBinding> FreeListSpace<VM> for MarkSweepSpace<VM> {
    fn blocks(&self) -> &SegregatedBlocks {
        &self.blocks
    }
}

impl<VM: VMBinding> MarkSweepSpace<VM> {
    pub fn new(args: PlanCreateSpaceArgs<VM>) -> Self {
        let pr = FreeListPageResource::new(args.heap.clone(), args.meta.start, args.meta.extent);
        let blocks = SegregatedBlocks::new(args.meta.start, args.meta.extent);
        MarkSweepSpace {
            common: CommonSpace::new(args),
            pr,
            blocks,
            mark_state: AtomicUsize::new(0),
        }
    }

    fn mark_state(&self) -> usize {
        self.mark_state.load(Ordering::Relaxed)
    }

    pub fn prepare(&self) {
        let flipped = MARK_BIT.max_value() - self.mark_state();
        self.mark_state.store(flipped, Ordering::Relaxed);
    }

    /// Free every object the trace did not mark, then rebuild the block lists.
    /// Every allocator of this space must have been flushed.
    pub fn release(&self) {
        let heap = &self.common.heap;
        let live = self.blocks.live_bitmap();
        let mark_state = self.mark_state();
        let mut freed = 0;
        self.blocks.for_each_block(|block, _| {
            live.for_each_set(block.start(), block.end(), |addr| {
                let Some(object) = ObjectReference::from_raw_address(addr) else {
                    return;
                };
                if !status::is_marked(heap, object, mark_state) {
                    live.clear(addr);
                    freed += 1;
                }
            });
        });
        let released = self.blocks.sweep(|block: Block| {
            self.pr.release_pages(block.start());
        });
        log::debug!("{}: freed {} objects, released {} blocks", self.get_name(), freed, released);
    }

    pub fn trace_object<Q: ObjectQueue>(&self, queue: &mut Q, object: ObjectReference) -> ObjectReference {
        debug_assert!(
            self.blocks.live_bitmap().is_set(object.to_raw_address()),
            "Cannot mark an object {} that was not allocated by the free list allocator",
            object
        );
        if status::test_and_mark(&self.common.heap, object, self.mark_state()) {
            queue.enqueue(object);
        }
        object
    }

    /// Cells that can be allocated without acquiring new blocks.
    pub fn free_cells(&self) -> usize {
        self.blocks.count_free_cells()
    }
}

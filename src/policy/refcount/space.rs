use crate::policy::marksweepspace::block::Block;
use crate::policy::marksweepspace::{FreeListSpace, SegregatedBlocks};
use crate::policy::space::{CommonSpace, PlanCreateSpaceArgs, Space, SFT};
use crate::util::heap::{FreeListPageResource, PageResource};
use crate::util::log;
use crate::util::ObjectReference;
use crate::vm::VMBinding;

/// The mature space of reference counting plans. Cells are handed out by
/// free-list allocators like in [`crate::policy::marksweepspace::MarkSweepSpace`],
/// but an object is freed the moment its count says it is dead. Sweeping
/// only returns the blocks that became empty.
pub struct RefCountSpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: FreeListPageResource,
    blocks: SegregatedBlocks,
}

impl<VM: VMBinding> SFT for RefCountSpace<VM> {
    fn name(&self) -> &'static str {
        self.common.name
    }

    // Counting frees dead objects as soon as it finds them.
    fn is_live(&self, object: ObjectReference) -> bool {
        self.is_allocated(object)
    }

    fn is_movable(&self) -> bool {
        false
    }

    // The plan owns the RC word, and sets it up in post_alloc and post_copy.
    fn initialize_object_metadata(&self, _object: ObjectReference, _alloc: bool) {}
}

impl<VM: VMBinding> Space<VM> for RefCountSpace<VM> {
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

impl<VM: VMBinding> FreeListSpace<VM> for RefCountSpace<VM> {
    fn blocks(&self) -> &SegregatedBlocks {
        &self.blocks
    }
}

impl<VM: VMBinding> RefCountSpace<VM> {
    pub fn new(args: PlanCreateSpaceArgs<VM>) -> Self {
        let pr = FreeListPageResource::new(args.heap.clone(), args.meta.start, args.meta.extent);
        let blocks = SegregatedBlocks::new(args.meta.start, args.meta.extent);
        RefCountSpace {
            common: CommonSpace::new(args),
            pr,
            blocks,
        }
    }

    /// Has the object been allocated and not yet freed?
    pub fn is_allocated(&self, object: ObjectReference) -> bool {
        self.blocks.live_bitmap().is_set(object.to_raw_address())
    }

    /// Turn the cell of a dead object back into a free cell.
    pub fn free(&self, object: ObjectReference) {
        let was_live = self.blocks.live_bitmap().clear(object.to_raw_address());
        debug_assert!(was_live, "{} is freed twice", object);
        log::trace!("{}: freed {}", self.get_name(), object);
    }

    /// Give empty blocks back to the page resource and relist the blocks
    /// with free cells. Every allocator of this space must have been flushed.
    pub fn release(&self) {
        let released = self.blocks.sweep(|block: Block| {
            self.pr.release_pages(block.start());
        });
        log::debug!("{}: released {} blocks", self.get_name(), released);
    }

    /// Cells that can be allocated without acquiring new blocks.
    pub fn free_cells(&self) -> usize {
        self.blocks.count_free_cells()
    }

    /// Objects allocated and not yet freed.
    pub fn allocated_objects(&self) -> usize {
        self.blocks.count_live_objects()
    }
}

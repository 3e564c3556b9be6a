use super::allocator::{align_allocation, get_maximum_aligned_size};
use crate::policy::marksweepspace::block::*;
use crate::policy::marksweepspace::FreeListSpace;
use crate::policy::space::Space;
use crate::util::alloc::Allocator;
use crate::util::log;
use crate::util::opaque_pointer::VMThread;
use crate::util::Address;
use crate::vm::VMBinding;

/// The cells this allocator is handing out for one size class.
#[derive(Default)]
struct LocalCells {
    block: Option<Block>,
    /// Free cells of `block`, popped from the end.
    cells: Vec<Address>,
}

/// A segregated free-list allocator. For each size class it owns at most one
/// block and pops cells from a local list built from that block's live bits.
/// An exhausted block is given back and replaced by a listed block of the
/// same class, or by a fresh block from the space.
pub struct FreeListAllocator<VM: VMBinding> {
    /// [`VMThread`] associated with this allocator instance
    pub tls: VMThread,
    space: &'static dyn FreeListSpace<VM>,
    available: [LocalCells; NUM_SIZE_CLASSES],
}

impl<VM: VMBinding> FreeListAllocator<VM> {
    pub fn new(tls: VMThread, space: &'static dyn FreeListSpace<VM>) -> Self {
        FreeListAllocator {
            tls,
            space,
            available: std::array::from_fn(|_| LocalCells::default()),
        }
    }

    fn size_class(size: usize, align: usize) -> usize {
        let max_bytes = get_maximum_aligned_size::<VM>(size, align);
        size_class_for(max_bytes)
            .unwrap_or_else(|| panic!("{} bytes is too large for a free list cell", max_bytes))
    }

    /// Take the next cell of `class` and place the object in it.
    fn alloc_cell(&mut self, class: usize, size: usize, align: usize, offset: usize) -> Option<Address> {
        let cell = self.available[class].cells.pop()?;
        let cell_size = SIZE_CLASSES[class];
        let blocks = self.space.blocks();
        let heap = &self.space.common().heap;
        heap.zero(cell, cell_size);
        let result = align_allocation::<VM>(cell, align, offset);
        debug_assert!(result + size <= cell + cell_size);
        let fresh = blocks.live_bitmap().set(result);
        debug_assert!(fresh, "Cell {} was handed out twice", cell);
        Some(result)
    }

    fn release_local_block(&mut self, class: usize) {
        let local = &mut self.available[class];
        if let Some(block) = local.block.take() {
            self.space.blocks().return_block(block, !local.cells.is_empty());
            local.cells.clear();
        }
    }

    fn acquire_fresh_block(&mut self, class: usize) -> Option<(Block, Vec<Address>)> {
        let start = self.space.acquire(self.tls, PAGES_IN_BLOCK);
        if start.is_zero() {
            return None;
        }
        let block = Block::from_aligned_address(start);
        let blocks = self.space.blocks();
        blocks.init_block(block, class);
        log::trace!("Acquired {:?} for size class {}", block, SIZE_CLASSES[class]);
        Some((block, block.cells(SIZE_CLASSES[class]).collect()))
    }
}

impl<VM: VMBinding> Allocator<VM> for FreeListAllocator<VM> {
    fn get_tls(&self) -> VMThread {
        self.tls
    }

    fn get_space(&self) -> &'static dyn Space<VM> {
        self.space.as_space()
    }

    fn alloc(&mut self, size: usize, align: usize, offset: usize) -> Address {
        let class = Self::size_class(size, align);
        match self.alloc_cell(class, size, align, offset) {
            Some(result) => result,
            None => self.alloc_slow_once(size, align, offset),
        }
    }

    fn alloc_slow_once(&mut self, size: usize, align: usize, offset: usize) -> Address {
        let class = Self::size_class(size, align);
        self.release_local_block(class);
        let refill = match self.space.blocks().pop_listed(class) {
            Some(listed) => Some(listed),
            None => self.acquire_fresh_block(class),
        };
        let Some((block, mut cells)) = refill else {
            return Address::ZERO;
        };
        // Hand cells out in address order.
        cells.reverse();
        self.available[class] = LocalCells {
            block: Some(block),
            cells,
        };
        self.alloc_cell(class, size, align, offset).unwrap_or(Address::ZERO)
    }

    fn flush(&mut self) {
        for class in 0..NUM_SIZE_CLASSES {
            self.release_local_block(class);
        }
    }
}

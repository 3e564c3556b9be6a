use super::block::*;
use crate::util::live_bitmap::LiveBitmap;
use crate::util::log;
use crate::util::Address;
use std::sync::atomic::{AtomicU8, Ordering};

/// The block-level state of a segregated free-list space: the state and size
/// class of every block, one list of blocks with free cells per size class,
/// and a side live bitmap with a bit at the start of each allocated object.
///
/// A cell is free when no live bit falls inside it. Allocators take whole
/// blocks and rebuild their cell lists from the bitmap, so freeing an object
/// only clears its bit.
pub struct SegregatedBlocks {
    start: Address,
    states: Box<[AtomicU8]>,
    size_classes: Box<[AtomicU8]>,
    lists: [spin::Mutex<Vec<Block>>; NUM_SIZE_CLASSES],
    live: LiveBitmap,
}

impl SegregatedBlocks {
    pub fn new(start: Address, extent: usize) -> Self {
        debug_assert!(start.is_aligned_to(BYTES_IN_BLOCK));
        let blocks = extent >> LOG_BYTES_IN_BLOCK;
        SegregatedBlocks {
            start,
            states: (0..blocks).map(|_| AtomicU8::new(BlockState::Unused as u8)).collect(),
            size_classes: (0..blocks).map(|_| AtomicU8::new(0)).collect(),
            lists: std::array::from_fn(|_| spin::Mutex::new(vec![])),
            live: LiveBitmap::new(start, extent),
        }
    }

    fn index(&self, block: Block) -> usize {
        (block.start() - self.start) >> LOG_BYTES_IN_BLOCK
    }

    fn block_at(&self, index: usize) -> Block {
        Block::from_aligned_address(self.start + (index << LOG_BYTES_IN_BLOCK))
    }

    pub fn state(&self, block: Block) -> BlockState {
        self.states[self.index(block)].load(Ordering::SeqCst).into()
    }

    pub fn set_state(&self, block: Block, state: BlockState) {
        self.states[self.index(block)].store(state as u8, Ordering::SeqCst);
    }

    pub fn size_class(&self, block: Block) -> usize {
        self.size_classes[self.index(block)].load(Ordering::Relaxed) as usize
    }

    pub fn cell_size(&self, block: Block) -> usize {
        SIZE_CLASSES[self.size_class(block)]
    }

    pub fn live_bitmap(&self) -> &LiveBitmap {
        &self.live
    }

    /// A freshly acquired block is owned by the allocator that acquired it.
    pub fn init_block(&self, block: Block, size_class: usize) {
        debug_assert_eq!(self.state(block), BlockState::Unused);
        debug_assert!(!self.live.any_in(block.start(), block.end()));
        self.size_classes[self.index(block)].store(size_class as u8, Ordering::Relaxed);
        self.set_state(block, BlockState::Owned);
    }

    /// The cells of `block` with no live object, in address order.
    pub fn free_cells(&self, block: Block) -> Vec<Address> {
        let cell_size = self.cell_size(block);
        block
            .cells(cell_size)
            .filter(|&cell| !self.live.any_in(cell, cell + cell_size))
            .collect()
    }

    /// The block containing `cell` and the start of the cell.
    pub fn cell_of(&self, addr: Address) -> (Block, Address) {
        let block = Block::containing(addr);
        let cell_size = self.cell_size(block);
        let offset = addr - block.start();
        (block, block.start() + (offset - offset % cell_size))
    }

    /// Take a listed block of `size_class` that still has free cells.
    /// Blocks found without free cells are marked full on the way.
    pub fn pop_listed(&self, size_class: usize) -> Option<(Block, Vec<Address>)> {
        loop {
            let block = self.lists[size_class].lock().pop()?;
            debug_assert_eq!(self.state(block), BlockState::Listed);
            let cells = self.free_cells(block);
            if cells.is_empty() {
                self.set_state(block, BlockState::Full);
                continue;
            }
            self.set_state(block, BlockState::Owned);
            return Some((block, cells));
        }
    }

    /// An allocator gives a block back.
    pub fn return_block(&self, block: Block, has_free_cells: bool) {
        debug_assert_eq!(self.state(block), BlockState::Owned);
        if has_free_cells {
            self.set_state(block, BlockState::Listed);
            self.lists[self.size_class(block)].lock().push(block);
        } else {
            self.set_state(block, BlockState::Full);
        }
    }

    /// Visit every block that is not unused.
    pub fn for_each_block(&self, mut f: impl FnMut(Block, BlockState)) {
        for i in 0..self.states.len() {
            let state: BlockState = self.states[i].load(Ordering::SeqCst).into();
            if state != BlockState::Unused {
                f(self.block_at(i), state);
            }
        }
    }

    /// Rebuild the block lists from the live bitmap. Empty blocks become
    /// unused and are passed to `release`. Every allocator must have been
    /// flushed. Returns the number of released blocks.
    pub fn sweep(&self, mut release: impl FnMut(Block)) -> usize {
        for list in self.lists.iter() {
            list.lock().clear();
        }
        let mut released = 0;
        let mut listed = 0;
        self.for_each_block(|block, state| {
            debug_assert_ne!(state, BlockState::Owned, "{:?} is still owned by an allocator", block);
            if !self.live.any_in(block.start(), block.end()) {
                self.set_state(block, BlockState::Unused);
                release(block);
                released += 1;
            } else if self.free_cells(block).is_empty() {
                self.set_state(block, BlockState::Full);
            } else {
                self.set_state(block, BlockState::Listed);
                self.lists[self.size_class(block)].lock().push(block);
                listed += 1;
            }
        });
        log::debug!("Swept blocks: {} released, {} listed", released, listed);
        released
    }

    /// Free cells over every block in use.
    pub fn count_free_cells(&self) -> usize {
        let mut n = 0;
        self.for_each_block(|block, _| n += self.free_cells(block).len());
        n
    }

    /// Objects with a live bit.
    pub fn count_live_objects(&self) -> usize {
        let mut n = 0;
        self.for_each_block(|block, _| n += self.live.count(block.start(), block.end()));
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::*;

    #[test]
    fn sweep_lists_and_releases() {
        let blocks = SegregatedBlocks::new(HEAP_START, 4 * BYTES_IN_BLOCK);
        let class = size_class_for(32).unwrap();
        let a = Block::from_aligned_address(HEAP_START);
        let b = Block::from_aligned_address(HEAP_START + BYTES_IN_BLOCK);
        blocks.init_block(a, class);
        blocks.init_block(b, class);
        let cells = blocks.free_cells(a);
        assert_eq!(cells.len(), BYTES_IN_BLOCK / 32);
        blocks.live_bitmap().set(cells[0]);
        blocks.return_block(a, true);
        blocks.return_block(b, true);

        let mut released = vec![];
        assert_eq!(blocks.sweep(|blk| released.push(blk)), 1);
        assert_eq!(released, vec![b]);
        assert_eq!(blocks.state(b), BlockState::Unused);
        assert_eq!(blocks.count_free_cells(), BYTES_IN_BLOCK / 32 - 1);
        assert_eq!(blocks.count_live_objects(), 1);

        let (blk, free) = blocks.pop_listed(class).unwrap();
        assert_eq!(blk, a);
        assert_eq!(free[0], cells[1]);
        assert!(blocks.pop_listed(class).is_none());
        assert_eq!(blocks.cell_of(cells[3] + 8usize), (a, cells[3]));
    }
}

use crate::util::constants::*;
use crate::util::Address;

/// Blocks are 4 pages.
pub const LOG_PAGES_IN_BLOCK: u8 = 2;
pub const PAGES_IN_BLOCK: usize = 1 << LOG_PAGES_IN_BLOCK;
pub const LOG_BYTES_IN_BLOCK: u8 = LOG_BYTES_IN_PAGE + LOG_PAGES_IN_BLOCK;
pub const BYTES_IN_BLOCK: usize = 1 << LOG_BYTES_IN_BLOCK;

/// The cell size of each size class.
pub const SIZE_CLASSES: [usize; 15] = [
    16, 24, 32, 48, 64, 96, 128, 192, 256, 384, 512, 768, 1024, 1536, 2048,
];
pub const NUM_SIZE_CLASSES: usize = SIZE_CLASSES.len();
/// The largest object a segregated free list can hold.
pub const MAX_CELL_SIZE: usize = SIZE_CLASSES[NUM_SIZE_CLASSES - 1];

/// The smallest size class that fits `bytes`.
pub fn size_class_for(bytes: usize) -> Option<usize> {
    SIZE_CLASSES.iter().position(|&cell| cell >= bytes)
}

/// A block-aligned region of [`BYTES_IN_BLOCK`] bytes, cut into cells of one size class.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Block(Address);

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Block({})", self.0)
    }
}

impl Block {
    pub fn from_aligned_address(address: Address) -> Self {
        debug_assert!(address.is_aligned_to(BYTES_IN_BLOCK));
        debug_assert!(!address.is_zero());
        Block(address)
    }

    /// The block an address falls into.
    pub fn containing(address: Address) -> Self {
        Block(address.align_down(BYTES_IN_BLOCK))
    }

    pub fn start(&self) -> Address {
        self.0
    }

    pub fn end(&self) -> Address {
        self.0 + BYTES_IN_BLOCK
    }

    /// The cells of a block cut into `cell_size` cells, in address order.
    pub fn cells(&self, cell_size: usize) -> impl Iterator<Item = Address> {
        let start = self.0;
        (0..BYTES_IN_BLOCK / cell_size).map(move |i| start + i * cell_size)
    }
}

/// Who holds a block.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// Not allocated. Its pages belong to the page resource.
    Unused = 0,
    /// An allocator is allocating from it.
    Owned = 1,
    /// On the free block list of its size class.
    Listed = 2,
    /// No free cell was left when it was last looked at.
    Full = 3,
}

impl From<u8> for BlockState {
    fn from(state: u8) -> Self {
        match state {
            0 => BlockState::Unused,
            1 => BlockState::Owned,
            2 => BlockState::Listed,
            3 => BlockState::Full,
            _ => unreachable!("Invalid block state {}", state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_classes() {
        assert_eq!(size_class_for(1), Some(0));
        assert_eq!(SIZE_CLASSES[size_class_for(24).unwrap()], 24);
        assert_eq!(SIZE_CLASSES[size_class_for(25).unwrap()], 32);
        assert_eq!(size_class_for(MAX_CELL_SIZE + 1), None);
        assert!(SIZE_CLASSES.windows(2).all(|w| w[0] < w[1]));
        assert!(SIZE_CLASSES.iter().all(|s| s % MIN_OBJECT_SIZE == 0));
    }

    #[test]
    fn cells_cover_the_block() {
        let block = Block::from_aligned_address(HEAP_START);
        let cells: Vec<Address> = block.cells(48).collect();
        assert_eq!(cells.len(), BYTES_IN_BLOCK / 48);
        assert_eq!(cells[1] - cells[0], 48);
        assert!(*cells.last().unwrap() + 48usize <= block.end());
        assert_eq!(Block::containing(cells[5]), block);
    }
}

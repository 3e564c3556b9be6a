use super::allocator::{align_allocation, get_maximum_aligned_size};
use crate::util::Address;

use crate::util::alloc::Allocator;

use crate::policy::space::Space;
use crate::util::constants::BYTES_IN_PAGE;
use crate::util::conversions::{bytes_to_pages, raw_align_up};
use crate::util::log;
use crate::util::opaque_pointer::VMThread;
use crate::vm::VMBinding;

/// A bump pointer over page-sized chunks taken from a copy space, the
/// nursery or the immortal space. Every chunk goes through
/// [`Space::acquire`], so the GC trigger is polled once per page consumed.
pub struct BumpAllocator<VM: VMBinding> {
    /// [`VMThread`] associated with this allocator instance
    pub tls: VMThread,
    /// Current cursor for bump pointer
    cursor: Address,
    /// Limit for bump pointer
    limit: Address,
    /// [`Space`] instance associated with this allocator instance.
    space: &'static dyn Space<VM>,
}

impl<VM: VMBinding> BumpAllocator<VM> {
    pub fn new(tls: VMThread, space: &'static dyn Space<VM>) -> Self {
        BumpAllocator {
            tls,
            cursor: Address::ZERO,
            limit: Address::ZERO,
            space,
        }
    }

    pub fn set_limit(&mut self, cursor: Address, limit: Address) {
        self.cursor = cursor;
        self.limit = limit;
    }

    pub fn reset(&mut self) {
        self.cursor = Address::ZERO;
        self.limit = Address::ZERO;
    }

    /// Allocate from another space from now on. Used when semispaces flip.
    pub fn rebind(&mut self, space: &'static dyn Space<VM>) {
        self.reset();
        self.space = space;
    }

    pub fn cursor(&self) -> Address {
        self.cursor
    }
}

impl<VM: VMBinding> Allocator<VM> for BumpAllocator<VM> {
    fn get_tls(&self) -> VMThread {
        self.tls
    }

    fn get_space(&self) -> &'static dyn Space<VM> {
        self.space
    }

    #[inline(always)]
    fn alloc(&mut self, size: usize, align: usize, offset: usize) -> Address {
        let result = align_allocation::<VM>(self.cursor, align, offset);
        let new_cursor = result + size;

        if new_cursor > self.limit {
            log::trace!("Thread local buffer used up, go to alloc slow path");
            self.alloc_slow_once(size, align, offset)
        } else {
            self.cursor = new_cursor;
            log::trace!(
                "Bump allocation size: {}, result: {}, new_cursor: {}, limit: {}",
                size,
                result,
                self.cursor,
                self.limit
            );
            result
        }
    }

    fn alloc_slow_once(&mut self, size: usize, align: usize, offset: usize) -> Address {
        let chunk_size = raw_align_up(get_maximum_aligned_size::<VM>(size, align), BYTES_IN_PAGE);
        let acquired_start = self.space.acquire(self.tls, bytes_to_pages(chunk_size));
        if acquired_start.is_zero() {
            log::trace!("Failed to acquire a new chunk");
            return acquired_start;
        }
        log::trace!(
            "Acquired a new chunk of size {} with start address {}",
            chunk_size,
            acquired_start
        );
        if acquired_start == self.limit && !self.cursor.is_zero() {
            // Contiguous with the current chunk: keep bumping from the cursor.
            self.limit = acquired_start + chunk_size;
        } else {
            self.set_limit(acquired_start, acquired_start + chunk_size);
        }
        let result = align_allocation::<VM>(self.cursor, align, offset);
        debug_assert!(result + size <= self.limit);
        self.cursor = result + size;
        result
    }

    fn flush(&mut self) {
        self.reset();
    }
}

use crate::util::conversions;
use crate::util::heap::PageAccounting;
use crate::util::memory::HeapMemory;
use crate::util::Address;
use std::sync::Arc;

/// A successful page request.
#[derive(Debug, Copy, Clone)]
pub struct PRAllocResult {
    pub start: Address,
    pub pages: usize,
}

/// The page resource has no contiguous range left for the request.
#[derive(Debug, Copy, Clone)]
pub struct PRAllocFail;

/// A page resource hands out page-aligned, zeroed memory from the extent of one space.
pub trait PageResource: Sync + 'static {
    /// Reserve pages before attempting to get them, so the pending request
    /// already counts against the heap budget.
    fn reserve_pages(&self, pages: usize) -> usize {
        self.common().accounting.reserve(pages);
        pages
    }

    /// Undo a reservation for a request that could not be satisfied.
    fn clear_request(&self, reserved_pages: usize) {
        self.common().accounting.clear_reserved(reserved_pages);
    }

    /// Get `required_pages` zeroed pages. `reserved_pages` must have been reserved with [`PageResource::reserve_pages`].
    fn get_new_pages(&self, reserved_pages: usize, required_pages: usize) -> Result<PRAllocResult, PRAllocFail>;

    /// Account for pages that were handed out. A request may have reserved a different amount from what it got.
    fn commit_pages(&self, reserved_pages: usize, actual_pages: usize) {
        let accounting = &self.common().accounting;
        if actual_pages > reserved_pages {
            accounting.reserve(actual_pages - reserved_pages);
        } else if actual_pages < reserved_pages {
            accounting.clear_reserved(reserved_pages - actual_pages);
        }
        accounting.commit(actual_pages);
    }

    fn reserved_pages(&self) -> usize {
        self.common().accounting.get_reserved_pages()
    }

    fn committed_pages(&self) -> usize {
        self.common().accounting.get_committed_pages()
    }

    /// The number of pages this resource can still hand out.
    fn get_available_physical_pages(&self) -> usize;

    fn common(&self) -> &CommonPageResource;
}

pub struct CommonPageResource {
    pub accounting: PageAccounting,
    /// The first address of the extent.
    pub start: Address,
    /// The size of the extent in bytes.
    pub extent: usize,
    pub heap: Arc<HeapMemory>,
}

impl CommonPageResource {
    pub fn new(heap: Arc<HeapMemory>, start: Address, extent: usize) -> Self {
        debug_assert!(conversions::is_page_aligned(start));
        CommonPageResource {
            accounting: PageAccounting::new(),
            start,
            extent,
            heap,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.extent >> crate::util::constants::LOG_BYTES_IN_PAGE
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.start + self.extent
    }

    /// Zero freshly handed out pages.
    pub fn zero_pages(&self, start: Address, pages: usize) {
        self.heap.zero(start, conversions::pages_to_bytes(pages));
    }
}

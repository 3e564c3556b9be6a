use super::pageresource::{CommonPageResource, PRAllocFail, PRAllocResult, PageResource};
use crate::util::constants::*;
use crate::util::conversions::*;
use crate::util::freelist::FreeList;
use crate::util::log;
use crate::util::memory::HeapMemory;
use crate::util::Address;
use std::sync::Arc;

/// Pages handed out from a free list, so they can be returned one run at a
/// time. Used by segregated free-list spaces (for blocks) and the large object space.
pub struct FreeListPageResource {
    common: CommonPageResource,
    free_list: spin::Mutex<FreeList>,
}

impl PageResource for FreeListPageResource {
    fn common(&self) -> &CommonPageResource {
        &self.common
    }

    fn get_available_physical_pages(&self) -> usize {
        self.free_list.lock().free_units()
    }

    fn get_new_pages(&self, reserved_pages: usize, required_pages: usize) -> Result<PRAllocResult, PRAllocFail> {
        let unit = self.free_list.lock().alloc(required_pages);
        let Some(unit) = unit else {
            log::debug!(
                "Free list page resource at {} has no run of {} pages",
                self.common.start,
                required_pages
            );
            return Err(PRAllocFail);
        };
        let rtn = self.common.start + pages_to_bytes(unit);
        self.common.zero_pages(rtn, required_pages);
        self.commit_pages(reserved_pages, required_pages);
        Ok(PRAllocResult {
            start: rtn,
            pages: required_pages,
        })
    }
}

impl FreeListPageResource {
    pub fn new(heap: Arc<HeapMemory>, start: Address, extent: usize) -> Self {
        FreeListPageResource {
            common: CommonPageResource::new(heap, start, extent),
            free_list: spin::Mutex::new(FreeList::new(extent >> LOG_BYTES_IN_PAGE)),
        }
    }

    /// Return the run of pages starting at `first`. Returns the number of pages freed.
    pub fn release_pages(&self, first: Address) -> usize {
        debug_assert!(is_page_aligned(first));
        let unit = (first - self.common.start) >> LOG_BYTES_IN_PAGE;
        let pages = self.free_list.lock().free(unit);
        self.common.accounting.release(pages);
        pages
    }

    /// The number of pages in the run starting at `first`.
    pub fn pages_in_run(&self, first: Address) -> usize {
        let unit = (first - self.common.start) >> LOG_BYTES_IN_PAGE;
        self.free_list.lock().size(unit).unwrap_or(0)
    }
}

use super::pageresource::{CommonPageResource, PRAllocFail, PRAllocResult, PageResource};
use crate::util::conversions::*;
use crate::util::log;
use crate::util::memory::HeapMemory;
use crate::util::Address;
use std::sync::{Arc, Mutex};

/// A bump pointer over the extent of a space. Pages are only given back all at
/// once, by [`MonotonePageResource::reset`]. Used by copy spaces, the nursery
/// and the immortal space.
pub struct MonotonePageResource {
    common: CommonPageResource,
    sync: Mutex<MonotonePageResourceSync>,
}

struct MonotonePageResourceSync {
    /// Pointer to the next page to be handed out.
    cursor: Address,
    /// The limit of the extent.
    sentinel: Address,
}

impl PageResource for MonotonePageResource {
    fn common(&self) -> &CommonPageResource {
        &self.common
    }

    fn get_available_physical_pages(&self) -> usize {
        let sync = self.sync.lock().unwrap();
        (sync.sentinel - sync.cursor) >> crate::util::constants::LOG_BYTES_IN_PAGE
    }

    fn get_new_pages(&self, reserved_pages: usize, required_pages: usize) -> Result<PRAllocResult, PRAllocFail> {
        let bytes = pages_to_bytes(required_pages);
        let rtn = {
            let mut sync = self.sync.lock().unwrap();
            if sync.cursor + bytes > sync.sentinel {
                log::debug!(
                    "Monotone page resource at {} exhausted: {} pages requested",
                    self.common.start,
                    required_pages
                );
                return Err(PRAllocFail);
            }
            let rtn = sync.cursor;
            sync.cursor += bytes;
            rtn
        };
        self.common.zero_pages(rtn, required_pages);
        self.commit_pages(reserved_pages, required_pages);
        Ok(PRAllocResult {
            start: rtn,
            pages: required_pages,
        })
    }
}

impl MonotonePageResource {
    pub fn new(heap: Arc<HeapMemory>, start: Address, extent: usize) -> Self {
        MonotonePageResource {
            common: CommonPageResource::new(heap, start, extent),
            sync: Mutex::new(MonotonePageResourceSync {
                cursor: start,
                sentinel: start + extent,
            }),
        }
    }

    /// The next address to be handed out.
    pub fn cursor(&self) -> Address {
        self.sync.lock().unwrap().cursor
    }

    /// Give back every page.
    pub fn reset(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.cursor = self.common.start;
        self.common.accounting.reset();
    }
}

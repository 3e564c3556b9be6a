use crate::util::constants::{BYTES_IN_ADDRESS, BYTES_IN_PAGE};
use crate::util::heap::PageAccounting;
use crate::util::ObjectReference;
use crossbeam::queue::SegQueue;

/// Entries in one chunk. A chunk is sized like one page of addresses, less a
/// word for its link.
pub const CHUNK_ENTRIES: usize = BYTES_IN_PAGE / BYTES_IN_ADDRESS - 1;

pub type Chunk = Vec<ObjectReference>;

/// The backing store of every deque. Each chunk in use counts as one page.
pub struct MetaDataPool {
    recycled: SegQueue<Chunk>,
    accounting: PageAccounting,
}

impl MetaDataPool {
    pub fn new() -> Self {
        MetaDataPool {
            recycled: SegQueue::new(),
            accounting: PageAccounting::new(),
        }
    }

    /// Hand out an empty chunk.
    pub fn alloc_chunk(&self) -> Chunk {
        self.accounting.reserve_and_commit(1);
        match self.recycled.pop() {
            Some(chunk) => {
                debug_assert!(chunk.is_empty());
                chunk
            }
            None => Vec::with_capacity(CHUNK_ENTRIES),
        }
    }

    /// Take back a chunk that is no longer in use.
    pub fn free_chunk(&self, mut chunk: Chunk) {
        if chunk.capacity() == 0 {
            // Never handed out by this pool.
            return;
        }
        chunk.clear();
        self.accounting.release(1);
        self.recycled.push(chunk);
    }

    /// Pages held by live chunks.
    pub fn reserved_pages(&self) -> usize {
        self.accounting.get_reserved_pages()
    }
}

impl Default for MetaDataPool {
    fn default() -> Self {
        Self::new()
    }
}

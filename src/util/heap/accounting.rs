use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// Page usage of a page resource or of the work-queue pool.
pub struct PageAccounting {
    /// The reserved pages. This is incremented before we attempt to get pages,
    /// so a pending request already counts against the heap budget.
    reserved: AtomicUsize,
    /// The committed pages. This is incremented once pages are actually handed out.
    committed: AtomicUsize,
}

impl PageAccounting {
    pub fn new() -> Self {
        Self {
            reserved: AtomicUsize::new(0),
            committed: AtomicUsize::new(0),
        }
    }

    /// Inform of both reserving and committing a certain number of pages.
    pub fn reserve_and_commit(&self, pages: usize) {
        self.reserved.fetch_add(pages, Ordering::Relaxed);
        self.committed.fetch_add(pages, Ordering::Relaxed);
    }

    /// Inform of reserving a certain number of pages. Usually this is called before attempting
    /// to allocate memory.
    pub fn reserve(&self, pages: usize) {
        self.reserved.fetch_add(pages, Ordering::Relaxed);
    }

    /// Inform of clearing some reserved pages. This is used when we have reserved some pages but
    /// the allocation cannot be satisfied.
    pub fn clear_reserved(&self, pages: usize) {
        let _prev = self.reserved.fetch_sub(pages, Ordering::Relaxed);
        debug_assert!(_prev >= pages);
    }

    /// Inform of successfully committing a certain number of pages.
    pub fn commit(&self, pages: usize) {
        self.committed.fetch_add(pages, Ordering::Relaxed);
    }

    /// Inform of releasing a certain number of pages. The number of pages will be deducted from
    /// both reserved and committed pages.
    pub fn release(&self, pages: usize) {
        let _prev_reserved = self.reserved.fetch_sub(pages, Ordering::Relaxed);
        debug_assert!(_prev_reserved >= pages);

        let _prev_committed = self.committed.fetch_sub(pages, Ordering::Relaxed);
        debug_assert!(_prev_committed >= pages);
    }

    /// Set both reserved and committed pages to zero. This is only used when we completely clear a space.
    pub fn reset(&self) {
        self.reserved.store(0, Ordering::Relaxed);
        self.committed.store(0, Ordering::Relaxed);
    }

    pub fn get_reserved_pages(&self) -> usize {
        self.reserved.load(Ordering::Relaxed)
    }

    pub fn get_committed_pages(&self) -> usize {
        self.committed.load(Ordering::Relaxed)
    }
}

impl Default for PageAccounting {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_commit_release() {
        let pa = PageAccounting::new();
        pa.reserve(4);
        assert_eq!(pa.get_reserved_pages(), 4);
        assert_eq!(pa.get_committed_pages(), 0);
        pa.commit(4);
        pa.reserve_and_commit(2);
        pa.release(3);
        assert_eq!(pa.get_reserved_pages(), 3);
        assert_eq!(pa.get_committed_pages(), 3);
        pa.reserve(1);
        pa.clear_reserved(1);
        assert_eq!(pa.get_reserved_pages(), 3);
        pa.reset();
        assert_eq!(pa.get_committed_pages(), 0);
    }
}

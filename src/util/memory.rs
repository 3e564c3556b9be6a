//! The simulated heap. Every byte the collector hands out lives in one
//! word-granular arena, so object graphs are addressed by plain integers and
//! every access is bounds checked.

use crate::util::constants::*;
use crate::util::log;
use crate::util::{Address, ObjectReference};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct HeapMemory {
    start: Address,
    words: Box<[AtomicUsize]>,
}

impl HeapMemory {
    /// Create a zeroed arena of `bytes` (rounded up to whole pages) starting at `start`.
    pub fn new(start: Address, bytes: usize) -> Self {
        assert!(start.is_aligned_to(BYTES_IN_PAGE) && !start.is_zero());
        let n_words = crate::util::conversions::raw_align_up(bytes, BYTES_IN_PAGE) >> LOG_BYTES_IN_WORD;
        let words: Box<[usize]> = vec![0usize; n_words].into_boxed_slice();
        // SAFETY: AtomicUsize has the same in-memory representation as usize.
        let words = unsafe { Box::from_raw(Box::into_raw(words) as *mut [AtomicUsize]) };
        log::debug!("Heap arena {} ~ {} ({} words)", start, start + (n_words << LOG_BYTES_IN_WORD), n_words);
        HeapMemory { start, words }
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.start + (self.words.len() << LOG_BYTES_IN_WORD)
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.end()
    }

    fn index(&self, addr: Address) -> usize {
        if !self.contains(addr) || !addr.is_aligned_to(BYTES_IN_WORD) {
            panic!(
                "Heap access at {} is outside the arena {} ~ {} or misaligned",
                addr,
                self.start,
                self.end()
            );
        }
        (addr - self.start) >> LOG_BYTES_IN_WORD
    }

    /// The atomic word at `addr`.
    pub fn word(&self, addr: Address) -> &AtomicUsize {
        &self.words[self.index(addr)]
    }

    pub fn load(&self, addr: Address) -> usize {
        self.word(addr).load(Ordering::Acquire)
    }

    pub fn store(&self, addr: Address, value: usize) {
        self.word(addr).store(value, Ordering::Release)
    }

    pub fn compare_exchange(&self, addr: Address, old: usize, new: usize) -> Result<usize, usize> {
        self.word(addr)
            .compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire)
    }

    /// Load a reference slot. A zero word reads as `None`.
    pub fn load_reference(&self, slot: Address) -> Option<ObjectReference> {
        ObjectReference::from_raw_address(Address::from_usize(self.load(slot)))
    }

    pub fn store_reference(&self, slot: Address, target: Option<ObjectReference>) {
        self.store(slot, target.map_or(0, |o| o.to_raw_address().as_usize()))
    }

    /// Zero `bytes` starting at `start`. Both must be word aligned.
    pub fn zero(&self, start: Address, bytes: usize) {
        debug_assert!(bytes % BYTES_IN_WORD == 0);
        if bytes == 0 {
            return;
        }
        let from = self.index(start);
        let to = self.index(start + (bytes - BYTES_IN_WORD));
        for w in &self.words[from..=to] {
            w.store(0, Ordering::Relaxed);
        }
    }

    /// Copy `bytes` from `from` to `to`. The ranges must not overlap.
    pub fn copy(&self, from: Address, to: Address, bytes: usize) {
        debug_assert!(bytes % BYTES_IN_WORD == 0);
        debug_assert!(from + bytes <= to || to + bytes <= from, "overlapping copy");
        let src = self.index(from);
        let dst = self.index(to);
        let n = bytes >> LOG_BYTES_IN_WORD;
        for i in 0..n {
            let v = self.words[src + i].load(Ordering::Relaxed);
            self.words[dst + i].store(v, Ordering::Relaxed);
        }
        std::sync::atomic::fence(Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap() -> HeapMemory {
        HeapMemory::new(HEAP_START, 4 * BYTES_IN_PAGE)
    }

    #[test]
    fn starts_zeroed() {
        let heap = heap();
        assert_eq!(heap.load(HEAP_START), 0);
        assert_eq!(heap.load(heap.end() - BYTES_IN_WORD), 0);
    }

    #[test]
    fn references_round_trip_null() {
        let heap = heap();
        let slot = HEAP_START + 64usize;
        assert_eq!(heap.load_reference(slot), None);
        let obj = ObjectReference::from_raw_address(HEAP_START + 128usize);
        heap.store_reference(slot, obj);
        assert_eq!(heap.load_reference(slot), obj);
    }

    #[test]
    fn zero_and_copy() {
        let heap = heap();
        for i in 0..4 {
            heap.store(HEAP_START + i * BYTES_IN_WORD, i + 1);
        }
        heap.copy(HEAP_START, HEAP_START + BYTES_IN_PAGE, 4 * BYTES_IN_WORD);
        heap.zero(HEAP_START, 4 * BYTES_IN_WORD);
        assert_eq!(heap.load(HEAP_START + BYTES_IN_PAGE + 3 * BYTES_IN_WORD), 4);
        assert_eq!(heap.load(HEAP_START + 3 * BYTES_IN_WORD), 0);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_panics() {
        let heap = heap();
        heap.load(heap.end());
    }
}

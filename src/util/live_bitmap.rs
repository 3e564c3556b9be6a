use crate::util::constants::*;
use crate::util::Address;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A side bitmap with one bit per minimum object size (one word) over an
/// extent. A set bit means an object starts at that address.
pub struct LiveBitmap {
    start: Address,
    extent: usize,
    bits: Box<[AtomicUsize]>,
}

impl LiveBitmap {
    pub fn new(start: Address, extent: usize) -> Self {
        debug_assert!(start.is_aligned_to(BYTES_IN_WORD));
        let n_bits = extent >> LOG_MIN_OBJECT_SIZE;
        let n_words = n_bits.div_ceil(BITS_IN_WORD);
        LiveBitmap {
            start,
            extent,
            bits: (0..n_words).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    #[inline(always)]
    fn bit_of(&self, addr: Address) -> (usize, usize) {
        debug_assert!(
            addr >= self.start && addr < self.start + self.extent,
            "{} is outside the bitmap",
            addr
        );
        debug_assert!(addr.is_aligned_to(MIN_OBJECT_SIZE));
        let bit = (addr - self.start) >> LOG_MIN_OBJECT_SIZE;
        (bit / BITS_IN_WORD, bit % BITS_IN_WORD)
    }

    fn addr_of(&self, word: usize, bit: usize) -> Address {
        self.start + ((word * BITS_IN_WORD + bit) << LOG_MIN_OBJECT_SIZE)
    }

    /// Set the bit for `addr`. Returns false if it was already set.
    pub fn set(&self, addr: Address) -> bool {
        let (w, b) = self.bit_of(addr);
        let old = self.bits[w].fetch_or(1 << b, Ordering::SeqCst);
        old & (1 << b) == 0
    }

    /// Clear the bit for `addr`. Returns false if it was not set.
    pub fn clear(&self, addr: Address) -> bool {
        let (w, b) = self.bit_of(addr);
        let old = self.bits[w].fetch_and(!(1 << b), Ordering::SeqCst);
        old & (1 << b) != 0
    }

    pub fn is_set(&self, addr: Address) -> bool {
        let (w, b) = self.bit_of(addr);
        self.bits[w].load(Ordering::SeqCst) & (1 << b) != 0
    }

    /// Is any bit set in `[start, end)`?
    pub fn any_in(&self, start: Address, end: Address) -> bool {
        let mut found = false;
        self.for_each_set(start, end, |_| found = true);
        found
    }

    /// Visit the address of each set bit in `[start, end)`, in address order.
    pub fn for_each_set(&self, start: Address, end: Address, mut f: impl FnMut(Address)) {
        if start >= end {
            return;
        }
        let (first_word, first_bit) = self.bit_of(start);
        let last = end - MIN_OBJECT_SIZE;
        let (last_word, last_bit) = self.bit_of(last);
        for w in first_word..=last_word {
            let mut bits = self.bits[w].load(Ordering::SeqCst);
            if w == first_word {
                bits &= usize::MAX << first_bit;
            }
            if w == last_word && last_bit + 1 < BITS_IN_WORD {
                bits &= (1 << (last_bit + 1)) - 1;
            }
            while bits != 0 {
                let b = bits.trailing_zeros() as usize;
                f(self.addr_of(w, b));
                bits &= bits - 1;
            }
        }
    }

    /// Clear every bit in `[start, end)`.
    pub fn clear_range(&self, start: Address, end: Address) {
        self.for_each_set(start, end, |a| {
            self.clear(a);
        });
    }

    /// The number of set bits in `[start, end)`.
    pub fn count(&self, start: Address, end: Address) -> usize {
        let mut n = 0;
        self.for_each_set(start, end, |_| n += 1);
        n
    }
}

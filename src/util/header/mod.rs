//! The GC header. Every object starts with [`GC_HEADER_WORDS`] words owned by
//! the collector:
//!
//! | word | contents |
//! |------|----------|
//! | 0    | status word: forwarding state, mark bit, log state ([`status`]) |
//! | 1    | reference count word: buffered flag, color, root flag, count ([`rc`]) |
//!
//! Plans declare which encoding they rely on with [`HeaderLayout`]. All
//! read-modify-write transitions on either word go through [`atomic_update`].

use crate::util::constants::BYTES_IN_WORD;
use crate::util::memory::HeapMemory;
use crate::util::ObjectReference;
use atomic_traits::Atomic;
use std::fmt::Debug;
use std::sync::atomic::Ordering;

pub mod rc;
pub mod status;

/// Number of words in the GC header.
pub const GC_HEADER_WORDS: usize = 2;
/// Number of bytes in the GC header.
pub const GC_HEADER_BYTES: usize = GC_HEADER_WORDS * BYTES_IN_WORD;

/// If an update does not succeed after this many attempts, we assume a livelock.
pub const MAX_UPDATE_ATTEMPTS: usize = 1 << 20;

/// The two header encodings. Every plan uses the status word. Only
/// reference counting plans give meaning to the RC word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeaderLayout {
    /// A single mark bit (with a per-cycle polarity), forwarding bits and log bits.
    Mark,
    /// Everything in `Mark`, plus count, color, buffered and root bits in the RC word.
    RefCount,
}

impl HeaderLayout {
    pub const fn uses_rc_word(&self) -> bool {
        matches!(self, HeaderLayout::RefCount)
    }
}

/// Names one of the header words.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeaderWord {
    Status = 0,
    RefCount = 1,
}

/// A field of `bits` bits starting at bit `shift` of a header word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitField {
    pub shift: u8,
    pub bits: u8,
}

impl BitField {
    pub const fn new(shift: u8, bits: u8) -> Self {
        assert!(bits > 0 && (shift as usize + bits as usize) <= usize::BITS as usize);
        BitField { shift, bits }
    }

    /// The largest value this field can hold.
    pub const fn max_value(&self) -> usize {
        if self.bits as u32 == usize::BITS {
            usize::MAX
        } else {
            (1usize << self.bits) - 1
        }
    }

    /// The mask of this field in place.
    pub const fn mask(&self) -> usize {
        self.max_value() << self.shift
    }

    pub const fn extract(&self, word: usize) -> usize {
        (word & self.mask()) >> self.shift
    }

    pub const fn insert(&self, word: usize, value: usize) -> usize {
        debug_assert!(value <= self.max_value());
        (word & !self.mask()) | (value << self.shift)
    }

    /// The unit that adds one to this field.
    pub const fn unit(&self) -> usize {
        1 << self.shift
    }
}

/// Atomically replace the value of `word` with `f(old)`, retrying if another
/// thread changes the word in between. `f` returns `None` to abandon the update.
///
/// Returns `Ok((old, new))` on success and `Err(old)` if `f` gave up.
/// Panics if the update does not converge within [`MAX_UPDATE_ATTEMPTS`].
pub fn atomic_update<A, F>(word: &A, mut f: F) -> Result<(A::Type, A::Type), A::Type>
where
    A: Atomic,
    A::Type: Copy + Debug,
    F: FnMut(A::Type) -> Option<A::Type>,
{
    let mut old = word.load(Ordering::Acquire);
    for _ in 0..MAX_UPDATE_ATTEMPTS {
        let new = match f(old) {
            Some(new) => new,
            None => return Err(old),
        };
        match word.compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return Ok((old, new)),
            Err(current) => {
                old = current;
                std::hint::spin_loop();
            }
        }
    }
    panic!(
        "Header update did not converge after {} attempts. Last seen value: {:?}",
        MAX_UPDATE_ATTEMPTS, old
    );
}

fn header_word(heap: &HeapMemory, object: ObjectReference, which: HeaderWord) -> &std::sync::atomic::AtomicUsize {
    heap.word(object.word(which as usize))
}

/// Read a header word of an object.
pub fn read_bits(heap: &HeapMemory, object: ObjectReference, which: HeaderWord) -> usize {
    header_word(heap, object, which).load(Ordering::Acquire)
}

/// Replace a header word if it still holds `expected`. Returns false if the
/// word has changed. Callers that must succeed retry, or use [`update_bits`].
pub fn compare_and_set_bits(
    heap: &HeapMemory,
    object: ObjectReference,
    which: HeaderWord,
    expected: usize,
    new: usize,
) -> bool {
    header_word(heap, object, which)
        .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// [`atomic_update`] on a header word of an object.
pub fn update_bits<F>(heap: &HeapMemory, object: ObjectReference, which: HeaderWord, f: F) -> Result<(usize, usize), usize>
where
    F: FnMut(usize) -> Option<usize>,
{
    atomic_update(header_word(heap, object, which), f)
}

/// Write a header word without synchronization. Only for objects that no
/// other thread can see yet, or while the world is stopped and the caller owns the object.
pub fn write_bits(heap: &HeapMemory, object: ObjectReference, which: HeaderWord, value: usize) {
    header_word(heap, object, which).store(value, Ordering::Release)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::{BYTES_IN_PAGE, HEAP_START};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn bitfield_insert_extract() {
        let f = BitField::new(3, 2);
        assert_eq!(f.mask(), 0b11000);
        let w = f.insert(0b111, 2);
        assert_eq!(w, 0b10111);
        assert_eq!(f.extract(w), 2);
        assert_eq!(f.unit(), 8);
    }

    #[test]
    fn bitfield_full_width() {
        let f = BitField::new(7, 57);
        assert_eq!(f.max_value(), usize::MAX >> 7);
        assert_eq!(f.extract(usize::MAX), usize::MAX >> 7);
    }

    #[test]
    fn atomic_update_aborts() {
        let w = AtomicUsize::new(5);
        assert_eq!(atomic_update(&w, |_| None), Err(5));
        assert_eq!(atomic_update(&w, |v| Some(v + 1)), Ok((5, 6)));
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 10_000;
        let w = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let w = w.clone();
                std::thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        atomic_update(&*w, |v| Some(v + 1)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(w.load(Ordering::SeqCst), THREADS * PER_THREAD);
    }

    #[test]
    fn contested_cas_has_one_winner() {
        // Every thread tries to move the word from 0 to its own id exactly once.
        const THREADS: usize = 16;
        let heap = Arc::new(HeapMemory::new(HEAP_START, BYTES_IN_PAGE));
        let obj = ObjectReference::from_raw_address(HEAP_START).unwrap();
        let handles: Vec<_> = (1..=THREADS)
            .map(|id| {
                let heap = heap.clone();
                std::thread::spawn(move || compare_and_set_bits(&heap, obj, HeaderWord::Status, 0, id))
            })
            .collect();
        let winners: Vec<usize> = handles
            .into_iter()
            .enumerate()
            .filter_map(|(i, h)| if h.join().unwrap() { Some(i + 1) } else { None })
            .collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(read_bits(&heap, obj, HeaderWord::Status), winners[0]);
    }

    #[test]
    fn retried_cas_serializes_all_updates() {
        // Each thread sets its own bit with a read-then-CAS retry loop.
        const THREADS: usize = 32;
        let heap = Arc::new(HeapMemory::new(HEAP_START, BYTES_IN_PAGE));
        let obj = ObjectReference::from_raw_address(HEAP_START).unwrap();
        let handles: Vec<_> = (0..THREADS)
            .map(|id| {
                let heap = heap.clone();
                std::thread::spawn(move || loop {
                    let old = read_bits(&heap, obj, HeaderWord::RefCount);
                    if compare_and_set_bits(&heap, obj, HeaderWord::RefCount, old, old | (1 << id)) {
                        break;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(read_bits(&heap, obj, HeaderWord::RefCount), (1usize << THREADS) - 1);
    }
}

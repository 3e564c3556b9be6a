//! The reference count word.
//!
//! ```text
//!  63                     7   6    5    4 .. 1   0
//! +------------------------+----+----+--------+----+
//! |         count          | FN | RR | color  | BF |
//! +------------------------+----+----+--------+----+
//! ```
//!
//! BF is the buffered flag (the object is in the purple buffer), RR is the
//! root-reachable flag, FN is reserved for finalization. The count is moved in
//! units of [`INCREMENT`], so arithmetic on it never touches the low bits.
//!
//! The count saturates. Once it reaches its maximum, increments and
//! decrements leave it unchanged and the object is never reclaimed by
//! reference counting.

use super::{update_bits, write_bits, BitField, HeaderWord};
use crate::util::memory::HeapMemory;
use crate::util::ObjectReference;

pub const BUFFERED_MASK: usize = 0x1;
pub const COLOR_MASK: usize = 0x1e;
pub const BLACK: usize = 0;
pub const GREY: usize = 0x2;
pub const WHITE: usize = 0x4;
/// Candidate root of a garbage cycle.
pub const PURPLE: usize = 0x8;
/// Acyclic. Never a cycle candidate.
pub const GREEN: usize = 0x10;
pub const ROOT_REACHABLE: usize = 0x20;
pub const FINALIZABLE: usize = 0x40;
pub const BITS_USED: u8 = 7;

pub const COUNT: BitField = BitField::new(BITS_USED, usize::BITS as u8 - BITS_USED);
pub const INCREMENT: usize = COUNT.unit();
/// Words at or above this value belong to live objects. A root-reachable
/// object is live regardless of its count.
pub const LIVE_THRESHOLD: usize = ROOT_REACHABLE;
const SATURATED: usize = COUNT.max_value();

/// The outcome of a decrement.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecResult {
    /// The object is dead and must be released.
    Kill,
    /// The object just became purple and must be added to the purple buffer.
    Buffer,
    /// The object is purple (or green). Nothing else to do.
    Purple,
    /// The count is saturated. Nothing to do.
    Sticky,
}

fn rc_word(heap: &HeapMemory, object: ObjectReference) -> usize {
    super::read_bits(heap, object, HeaderWord::RefCount)
}

pub fn get_rc(heap: &HeapMemory, object: ObjectReference) -> usize {
    COUNT.extract(rc_word(heap, object))
}

pub fn is_saturated(heap: &HeapMemory, object: ObjectReference) -> bool {
    get_rc(heap, object) == SATURATED
}

/// Set up the RC word of a new object. A fresh object may start with one
/// increment, which its allocator balances with a buffered decrement.
pub fn initialize_header(heap: &HeapMemory, object: ObjectReference, initial_inc: bool, acyclic: bool) {
    let mut word = if initial_inc { INCREMENT } else { 0 };
    if acyclic {
        word |= GREEN;
    }
    write_bits(heap, object, HeaderWord::RefCount, word);
}

/// Clear every RC bit except the green color. Used when an object is copied out of the nursery.
pub fn clear_gc_bits(heap: &HeapMemory, object: ObjectReference) {
    let green = rc_word(heap, object) & COLOR_MASK == GREEN;
    write_bits(heap, object, HeaderWord::RefCount, if green { GREEN } else { 0 });
}

/// Add one to the count. A purple object goes back to black.
pub fn inc(heap: &HeapMemory, object: ObjectReference) {
    let _ = update_bits(heap, object, HeaderWord::RefCount, |old| {
        if COUNT.extract(old) == SATURATED {
            return None;
        }
        if cfg!(feature = "extreme_assertions") {
            let color = old & COLOR_MASK;
            assert!(color != GREY && color != WHITE, "Increment of {} during trial deletion ({:#x})", object, old);
        }
        let new = old + INCREMENT;
        Some(if new & COLOR_MASK == PURPLE { new & !COLOR_MASK } else { new })
    });
}

/// Subtract one from the count, and report what the caller must do next.
pub fn dec(heap: &HeapMemory, object: ObjectReference) -> DecResult {
    let mut result = DecResult::Sticky;
    let _ = update_bits(heap, object, HeaderWord::RefCount, |old| {
        let count = COUNT.extract(old);
        if count == SATURATED {
            result = DecResult::Sticky;
            return None;
        }
        debug_assert!(count > 0, "Decrement of {} would make its count negative ({:#x})", object, old);
        let new = old - INCREMENT;
        if new < LIVE_THRESHOLD {
            result = DecResult::Kill;
            Some(new)
        } else if new & COLOR_MASK < PURPLE {
            result = if new & BUFFERED_MASK == 0 { DecResult::Buffer } else { DecResult::Purple };
            Some((new & !COLOR_MASK) | PURPLE | BUFFERED_MASK)
        } else {
            result = DecResult::Purple;
            Some(new)
        }
    });
    result
}

/// Turn a black object that is still counted into a cycle candidate, as a
/// decrement that leaves it live would. Returns true if the caller must add
/// it to the purple buffer.
pub fn make_purple(heap: &HeapMemory, object: ObjectReference) -> bool {
    update_bits(heap, object, HeaderWord::RefCount, |old| {
        if old & COLOR_MASK >= PURPLE || old & BUFFERED_MASK != 0 || COUNT.extract(old) == 0 {
            None
        } else {
            Some((old & !COLOR_MASK) | PURPLE | BUFFERED_MASK)
        }
    })
    .is_ok()
}

/// Increment without synchronization. Only for the cycle detector, which runs on one thread.
pub fn inc_unsync(heap: &HeapMemory, object: ObjectReference) {
    let old = rc_word(heap, object);
    if COUNT.extract(old) != SATURATED {
        write_bits(heap, object, HeaderWord::RefCount, old + INCREMENT);
    }
}

/// Decrement without synchronization. Returns whether the object is still
/// live (count or root flag). Only for the cycle detector.
pub fn dec_unsync(heap: &HeapMemory, object: ObjectReference) -> bool {
    let old = rc_word(heap, object);
    if COUNT.extract(old) == SATURATED {
        return true;
    }
    debug_assert!(COUNT.extract(old) > 0, "Trial decrement of {} underflows ({:#x})", object, old);
    let new = old - INCREMENT;
    write_bits(heap, object, HeaderWord::RefCount, new);
    new >= LIVE_THRESHOLD
}

/// Is the object alive as far as reference counting knows?
pub fn is_live_rc(heap: &HeapMemory, object: ObjectReference) -> bool {
    rc_word(heap, object) >= LIVE_THRESHOLD
}

/// Set the root-reachable flag. Returns true if this call set it.
pub fn set_root(heap: &HeapMemory, object: ObjectReference) -> bool {
    update_bits(heap, object, HeaderWord::RefCount, |old| {
        if old & ROOT_REACHABLE != 0 {
            None
        } else {
            Some(old | ROOT_REACHABLE)
        }
    })
    .is_ok()
}

pub fn unset_root(heap: &HeapMemory, object: ObjectReference) {
    let _ = update_bits(heap, object, HeaderWord::RefCount, |old| Some(old & !ROOT_REACHABLE));
}

pub fn is_root_reachable(heap: &HeapMemory, object: ObjectReference) -> bool {
    rc_word(heap, object) & ROOT_REACHABLE != 0
}

pub fn color(heap: &HeapMemory, object: ObjectReference) -> usize {
    rc_word(heap, object) & COLOR_MASK
}

fn set_color(heap: &HeapMemory, object: ObjectReference, color: usize) {
    let _ = update_bits(heap, object, HeaderWord::RefCount, |old| Some((old & !COLOR_MASK) | color));
}

pub fn is_green(heap: &HeapMemory, object: ObjectReference) -> bool {
    color(heap, object) == GREEN
}

pub fn is_black(heap: &HeapMemory, object: ObjectReference) -> bool {
    color(heap, object) == BLACK
}

pub fn is_grey(heap: &HeapMemory, object: ObjectReference) -> bool {
    color(heap, object) == GREY
}

pub fn is_white(heap: &HeapMemory, object: ObjectReference) -> bool {
    color(heap, object) == WHITE
}

pub fn is_purple(heap: &HeapMemory, object: ObjectReference) -> bool {
    color(heap, object) == PURPLE
}

/// Purple, and not yet visited by the current mark-grey pass.
pub fn is_purple_not_grey(heap: &HeapMemory, object: ObjectReference) -> bool {
    rc_word(heap, object) & (PURPLE | GREY) == PURPLE
}

pub fn make_black(heap: &HeapMemory, object: ObjectReference) {
    set_color(heap, object, BLACK)
}

pub fn make_white(heap: &HeapMemory, object: ObjectReference) {
    set_color(heap, object, WHITE)
}

pub fn make_grey(heap: &HeapMemory, object: ObjectReference) {
    debug_assert!(!is_green(heap, object), "Green object {} cannot be greyed", object);
    set_color(heap, object, GREY)
}

pub fn is_buffered(heap: &HeapMemory, object: ObjectReference) -> bool {
    rc_word(heap, object) & BUFFERED_MASK != 0
}

pub fn clear_buffered(heap: &HeapMemory, object: ObjectReference) {
    let _ = update_bits(heap, object, HeaderWord::RefCount, |old| Some(old & !BUFFERED_MASK));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::{BYTES_IN_PAGE, HEAP_START};
    use std::sync::Arc;

    fn setup() -> (Arc<HeapMemory>, ObjectReference) {
        let heap = Arc::new(HeapMemory::new(HEAP_START, BYTES_IN_PAGE));
        let obj = ObjectReference::from_raw_address(HEAP_START + 64usize).unwrap();
        (heap, obj)
    }

    #[test]
    fn increment_does_not_touch_status_bits() {
        let (heap, obj) = setup();
        initialize_header(&heap, obj, false, true);
        set_root(&heap, obj);
        inc(&heap, obj);
        inc(&heap, obj);
        assert_eq!(get_rc(&heap, obj), 2);
        assert!(is_green(&heap, obj));
        assert!(is_root_reachable(&heap, obj));
    }

    #[test]
    fn dec_to_zero_kills_once() {
        let (heap, obj) = setup();
        initialize_header(&heap, obj, true, false);
        inc(&heap, obj);
        // 2 -> 1: the object becomes a purple candidate.
        assert_eq!(dec(&heap, obj), DecResult::Buffer);
        assert!(is_purple(&heap, obj));
        assert!(is_buffered(&heap, obj));
        inc(&heap, obj);
        // The increment turned it black again but it stays buffered.
        assert!(is_black(&heap, obj));
        assert_eq!(dec(&heap, obj), DecResult::Purple);
        assert_eq!(dec(&heap, obj), DecResult::Kill);
        assert_eq!(get_rc(&heap, obj), 0);
        assert!(!is_live_rc(&heap, obj));
    }

    #[test]
    fn root_flag_keeps_object_live() {
        let (heap, obj) = setup();
        initialize_header(&heap, obj, true, false);
        assert!(set_root(&heap, obj));
        assert!(!set_root(&heap, obj));
        assert_eq!(dec(&heap, obj), DecResult::Buffer);
        assert!(is_live_rc(&heap, obj));
        unset_root(&heap, obj);
        assert!(!is_live_rc(&heap, obj));
    }

    #[test]
    fn green_objects_never_turn_purple() {
        let (heap, obj) = setup();
        initialize_header(&heap, obj, true, true);
        inc(&heap, obj);
        assert_eq!(dec(&heap, obj), DecResult::Purple);
        assert!(is_green(&heap, obj));
        assert!(!is_buffered(&heap, obj));
    }

    #[test]
    fn dropped_root_becomes_candidate() {
        let (heap, obj) = setup();
        initialize_header(&heap, obj, true, false);
        assert!(make_purple(&heap, obj));
        assert!(is_purple(&heap, obj) && is_buffered(&heap, obj));
        assert!(!make_purple(&heap, obj));
        let (heap, green) = setup();
        initialize_header(&heap, green, true, true);
        assert!(!make_purple(&heap, green));
        let (heap, dead) = setup();
        initialize_header(&heap, dead, false, false);
        assert!(!make_purple(&heap, dead));
    }

    #[test]
    fn count_saturates() {
        let (heap, obj) = setup();
        write_bits(&heap, obj, HeaderWord::RefCount, COUNT.insert(0, SATURATED - 1));
        inc(&heap, obj);
        assert!(is_saturated(&heap, obj));
        inc(&heap, obj);
        assert!(is_saturated(&heap, obj));
        assert_eq!(dec(&heap, obj), DecResult::Sticky);
        assert!(is_saturated(&heap, obj));
        assert!(is_live_rc(&heap, obj));
    }

    #[test]
    fn concurrent_inc_dec_never_negative() {
        let (heap, obj) = setup();
        initialize_header(&heap, obj, false, false);
        const THREADS: usize = 8;
        const OPS: usize = 5_000;
        // Every thread holds one reference for the whole run, so no decrement can kill.
        for _ in 0..THREADS {
            inc(&heap, obj);
        }
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let heap = heap.clone();
                std::thread::spawn(move || {
                    let mut kills = 0;
                    for _ in 0..OPS {
                        inc(&heap, obj);
                        if dec(&heap, obj) == DecResult::Kill {
                            kills += 1;
                        }
                    }
                    kills
                })
            })
            .collect();
        let kills: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(kills, 0);
        assert_eq!(get_rc(&heap, obj), THREADS);
        let mut kills = 0;
        for _ in 0..THREADS {
            if dec(&heap, obj) == DecResult::Kill {
                kills += 1;
            }
        }
        assert_eq!(kills, 1);
    }

    #[test]
    fn trial_decrements() {
        let (heap, obj) = setup();
        initialize_header(&heap, obj, true, false);
        inc_unsync(&heap, obj);
        assert!(dec_unsync(&heap, obj));
        assert!(!dec_unsync(&heap, obj));
        inc_unsync(&heap, obj);
        assert_eq!(get_rc(&heap, obj), 1);
        make_grey(&heap, obj);
        assert!(is_grey(&heap, obj));
        make_white(&heap, obj);
        assert!(is_white(&heap, obj));
        make_black(&heap, obj);
        assert!(is_black(&heap, obj));
    }
}

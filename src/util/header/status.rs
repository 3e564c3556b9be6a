//! The status word: forwarding state, mark bit and log state.
//!
//! While an object is forwarded, the whole word holds the address of the new
//! copy with [`FORWARDED`] in the low bits, and the other fields are meaningless.

use super::{update_bits, BitField, HeaderWord};
use crate::util::memory::HeapMemory;
use crate::util::ObjectReference;
use static_assertions::const_assert;

pub const FORWARDING_BITS: BitField = BitField::new(0, 2);
pub const MARK_BIT: BitField = BitField::new(2, 1);
pub const LOG_BITS: BitField = BitField::new(3, 2);

pub const NOT_FORWARDED: usize = 0b00;
pub const BEING_FORWARDED: usize = 0b10;
pub const FORWARDED: usize = 0b11;

/// No barrier action needed. Fresh objects start in this state.
pub const LOGGED: usize = 0;
/// The next reference store into this object takes the barrier slow path.
pub const UNLOGGED: usize = 1;
/// A mutator is taking the slow path for this object.
pub const BEING_LOGGED: usize = 2;

// The fields must not overlap, and a forwarding pointer needs the two low bits.
const_assert!(FORWARDING_BITS.mask() & MARK_BIT.mask() == 0);
const_assert!(MARK_BIT.mask() & LOG_BITS.mask() == 0);
const_assert!(FORWARDING_BITS.mask() & LOG_BITS.mask() == 0);
const_assert!(crate::util::constants::MIN_OBJECT_SIZE > FORWARDING_BITS.mask());

fn status(heap: &HeapMemory, object: ObjectReference) -> usize {
    super::read_bits(heap, object, HeaderWord::Status)
}

/// Is the mark bit of the object equal to `mark_state`?
pub fn is_marked(heap: &HeapMemory, object: ObjectReference, mark_state: usize) -> bool {
    MARK_BIT.extract(status(heap, object)) == mark_state
}

/// Set the mark bit to `mark_state`. Returns true if this call changed it,
/// i.e. this thread is the one that marked the object.
pub fn test_and_mark(heap: &HeapMemory, object: ObjectReference, mark_state: usize) -> bool {
    update_bits(heap, object, HeaderWord::Status, |old| {
        if MARK_BIT.extract(old) == mark_state {
            None
        } else {
            Some(MARK_BIT.insert(old, mark_state))
        }
    })
    .is_ok()
}

/// Set the mark bit without checking the previous value. Used when initializing a fresh object.
pub fn write_mark_state(heap: &HeapMemory, object: ObjectReference, mark_state: usize) {
    let _ = update_bits(heap, object, HeaderWord::Status, |old| Some(MARK_BIT.insert(old, mark_state)));
}

pub fn log_state(heap: &HeapMemory, object: ObjectReference) -> usize {
    LOG_BITS.extract(status(heap, object))
}

pub fn is_unlogged(heap: &HeapMemory, object: ObjectReference) -> bool {
    log_state(heap, object) == UNLOGGED
}

/// Try to claim the right to log an unlogged object. Exactly one thread
/// succeeds. The winner must call [`make_logged`] once it has recorded the object.
pub fn attempt_to_log(heap: &HeapMemory, object: ObjectReference) -> bool {
    update_bits(heap, object, HeaderWord::Status, |old| {
        if LOG_BITS.extract(old) == UNLOGGED {
            Some(LOG_BITS.insert(old, BEING_LOGGED))
        } else {
            None
        }
    })
    .is_ok()
}

/// Wait until another thread finishes logging the object.
pub fn spin_while_being_logged(heap: &HeapMemory, object: ObjectReference) {
    while log_state(heap, object) == BEING_LOGGED {
        std::hint::spin_loop();
    }
}

pub fn make_logged(heap: &HeapMemory, object: ObjectReference) {
    set_log_state(heap, object, LOGGED)
}

pub fn make_unlogged(heap: &HeapMemory, object: ObjectReference) {
    set_log_state(heap, object, UNLOGGED)
}

/// Unlog an object unless a collector has started to forward it. A forwarded
/// status word holds the new address, so the log bits must not be touched.
/// Returns false if the object was left alone.
pub fn make_unlogged_unless_forwarded(heap: &HeapMemory, object: ObjectReference) -> bool {
    update_bits(heap, object, HeaderWord::Status, |old| {
        if FORWARDING_BITS.extract(old) != NOT_FORWARDED {
            None
        } else {
            Some(LOG_BITS.insert(old, UNLOGGED))
        }
    })
    .is_ok()
}

fn set_log_state(heap: &HeapMemory, object: ObjectReference, state: usize) {
    let _ = update_bits(heap, object, HeaderWord::Status, |old| Some(LOG_BITS.insert(old, state)));
}

//! The forwarding protocol for copying spaces. Exactly one thread wins the
//! right to copy an object; every other thread spins until the winner has
//! published the new address, so there is only ever one copy.

use crate::util::header::status::{self, BEING_FORWARDED, FORWARDED, FORWARDING_BITS, NOT_FORWARDED};
use crate::util::header::{read_bits, update_bits, HeaderWord};
use crate::util::memory::HeapMemory;
use crate::util::{Address, ObjectReference};

/// Attempt to become the thread who will forward the object.
/// The successful thread will set the forwarding bits to BEING_FORWARDED, preventing other threads from forwarding the same object.
/// Returns the forwarding bits seen before this call. `NOT_FORWARDED` means the caller won.
pub fn attempt_to_forward(heap: &HeapMemory, object: ObjectReference) -> usize {
    match update_bits(heap, object, HeaderWord::Status, |old| {
        if FORWARDING_BITS.extract(old) == NOT_FORWARDED {
            Some(FORWARDING_BITS.insert(old, BEING_FORWARDED))
        } else {
            None
        }
    }) {
        Ok(_) => NOT_FORWARDED,
        Err(current) => FORWARDING_BITS.extract(current),
    }
}

/// Spin-wait for the object's forwarding to become complete and then read the forwarding pointer to the new object.
pub fn spin_and_get_forwarded_object(heap: &HeapMemory, object: ObjectReference, forwarding_bits: usize) -> ObjectReference {
    let mut forwarding_bits = forwarding_bits;
    while forwarding_bits == BEING_FORWARDED {
        std::hint::spin_loop();
        forwarding_bits = get_forwarding_status(heap, object);
    }
    debug_assert_eq!(
        forwarding_bits, FORWARDED,
        "Invalid forwarding state {:#b} for object {}",
        forwarding_bits, object
    );
    read_forwarding_pointer(heap, object)
}

/// Publish the new address of a copied object. Must only be called by the thread
/// that won [`attempt_to_forward`].
pub fn write_forwarding_pointer(heap: &HeapMemory, object: ObjectReference, new_object: ObjectReference) {
    debug_assert_eq!(get_forwarding_status(heap, object), BEING_FORWARDED);
    crate::util::header::write_bits(
        heap,
        object,
        HeaderWord::Status,
        new_object.to_raw_address().as_usize() | FORWARDED,
    );
}

pub fn get_forwarding_status(heap: &HeapMemory, object: ObjectReference) -> usize {
    FORWARDING_BITS.extract(read_bits(heap, object, HeaderWord::Status))
}

pub fn is_forwarded(heap: &HeapMemory, object: ObjectReference) -> bool {
    get_forwarding_status(heap, object) == FORWARDED
}

pub fn is_forwarded_or_being_forwarded(heap: &HeapMemory, object: ObjectReference) -> bool {
    get_forwarding_status(heap, object) != NOT_FORWARDED
}

pub fn read_forwarding_pointer(heap: &HeapMemory, object: ObjectReference) -> ObjectReference {
    let word = read_bits(heap, object, HeaderWord::Status);
    debug_assert_eq!(FORWARDING_BITS.extract(word), FORWARDED);
    ObjectReference::from_raw_address(Address::from_usize(word & !FORWARDING_BITS.mask()))
        .unwrap_or_else(|| panic!("Object {} has a null forwarding pointer", object))
}

/// Clear the forwarding bits of a fresh copy. The copy carries the original's
/// status word, which was BEING_FORWARDED at copy time.
pub fn clear_forwarding_bits(heap: &HeapMemory, object: ObjectReference) {
    let _ = update_bits(heap, object, HeaderWord::Status, |old| {
        Some(FORWARDING_BITS.insert(old, NOT_FORWARDED))
    });
}

/// Copy `bytes` of `object` to `to` without publishing the new address.
/// Other threads keep spinning until [`write_forwarding_pointer`].
pub fn copy_object(heap: &HeapMemory, object: ObjectReference, bytes: usize, to: Address) -> ObjectReference {
    heap.copy(object.to_object_start(), to, bytes);
    let new_object = ObjectReference::from_raw_address(to)
        .unwrap_or_else(|| panic!("Copying {} to a zero address", object));
    clear_forwarding_bits(heap, new_object);
    new_object
}

/// Copy `bytes` of `object` to `to`, publish the forwarding pointer and
/// return the new object. The caller must have won [`attempt_to_forward`].
pub fn forward_object(heap: &HeapMemory, object: ObjectReference, bytes: usize, to: Address) -> ObjectReference {
    let new_object = copy_object(heap, object, bytes, to);
    write_forwarding_pointer(heap, object, new_object);
    new_object
}

/// The mark bit a copied object inherited is meaningless in its new space.
pub fn reset_mark_bit(heap: &HeapMemory, object: ObjectReference, mark_state: usize) {
    status::write_mark_state(heap, object, mark_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::{BYTES_IN_PAGE, HEAP_START};
    use std::sync::Arc;

    #[test]
    fn single_winner_and_shared_result() {
        let heap = Arc::new(HeapMemory::new(HEAP_START, 4 * BYTES_IN_PAGE));
        let obj = ObjectReference::from_raw_address(HEAP_START).unwrap();
        heap.store(obj.word(2), 42);
        let cursor = Arc::new(std::sync::atomic::AtomicUsize::new(BYTES_IN_PAGE));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let heap = heap.clone();
                let cursor = cursor.clone();
                std::thread::spawn(move || {
                    let state = attempt_to_forward(&heap, obj);
                    if state == NOT_FORWARDED {
                        let offset = cursor.fetch_add(64, std::sync::atomic::Ordering::SeqCst);
                        (true, forward_object(&heap, obj, 24, HEAP_START + offset))
                    } else {
                        (false, spin_and_get_forwarded_object(&heap, obj, state))
                    }
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|(won, _)| *won).count(), 1);
        let copy = results[0].1;
        assert!(results.iter().all(|(_, o)| *o == copy));
        assert!(is_forwarded(&heap, obj));
        assert_eq!(heap.load(copy.word(2)), 42);
        assert_eq!(get_forwarding_status(&heap, copy), NOT_FORWARDED);
    }
}

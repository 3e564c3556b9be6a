//! The object layout of the mock runtime.
//!
//! ```text
//! +-----------+-----------+-------+----------------+-------------+
//! | GC status | GC rc     | shape | ref slots ...  | data ...    |
//! +-----------+-----------+-------+----------------+-------------+
//! ```
//!
//! The shape word holds the number of reference slots, the number of data
//! words and some flags. A soft reference keeps its referent in the first
//! data word, which the collector never scans.

use crate::util::constants::{BYTES_IN_WORD, LOG_BYTES_IN_WORD};
use crate::util::header::{BitField, GC_HEADER_WORDS};
use crate::util::memory::HeapMemory;
use crate::util::{Address, ObjectReference};

const SHAPE_WORD: usize = GC_HEADER_WORDS;
const FIRST_SLOT_WORD: usize = SHAPE_WORD + 1;

const REFS: BitField = BitField::new(0, 24);
const DATA: BitField = BitField::new(24, 24);
const FLAGS: BitField = BitField::new(48, 8);

/// The object has no cycles through it: a leaf, or an array of leaves.
pub const ACYCLIC: usize = 0x1;
/// The object is a soft reference; its referent is in data word 0.
pub const SOFT_REFERENCE: usize = 0x2;
/// The object is an array of references.
pub const REF_ARRAY: usize = 0x4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    pub refs: usize,
    pub data: usize,
    pub flags: usize,
}

impl Shape {
    pub const fn new(refs: usize, data: usize, flags: usize) -> Self {
        Shape { refs, data, flags }
    }

    fn encode(self) -> usize {
        FLAGS.insert(DATA.insert(REFS.insert(0, self.refs), self.data), self.flags)
    }

    fn decode(word: usize) -> Self {
        Shape {
            refs: REFS.extract(word),
            data: DATA.extract(word),
            flags: FLAGS.extract(word),
        }
    }
}

/// The size in bytes of an object with `refs` reference slots and `data` data words.
pub const fn bytes_for(refs: usize, data: usize) -> usize {
    (FIRST_SLOT_WORD + refs + data) << LOG_BYTES_IN_WORD
}

pub fn write_shape(heap: &HeapMemory, object: ObjectReference, shape: Shape) {
    heap.store(object.word(SHAPE_WORD), shape.encode());
}

pub fn shape(heap: &HeapMemory, object: ObjectReference) -> Shape {
    Shape::decode(heap.load(object.word(SHAPE_WORD)))
}

pub fn size(heap: &HeapMemory, object: ObjectReference) -> usize {
    let s = shape(heap, object);
    bytes_for(s.refs, s.data)
}

pub fn ref_slot(object: ObjectReference, i: usize) -> Address {
    object.word(FIRST_SLOT_WORD + i)
}

pub fn data_slot(heap: &HeapMemory, object: ObjectReference, i: usize) -> Address {
    object.word(FIRST_SLOT_WORD + shape(heap, object).refs + i)
}

pub fn get_ref(heap: &HeapMemory, object: ObjectReference, i: usize) -> Option<ObjectReference> {
    debug_assert!(i < shape(heap, object).refs);
    heap.load_reference(ref_slot(object, i))
}

/// Store into a reference slot without a barrier. Only for objects the
/// collector does not manage, or for setting up a heap by hand.
pub fn set_ref_raw(heap: &HeapMemory, object: ObjectReference, i: usize, target: Option<ObjectReference>) {
    heap.store_reference(ref_slot(object, i), target);
}

pub fn get_data(heap: &HeapMemory, object: ObjectReference, i: usize) -> usize {
    heap.load(data_slot(heap, object, i))
}

pub fn set_data(heap: &HeapMemory, object: ObjectReference, i: usize, value: usize) {
    heap.store(data_slot(heap, object, i), value)
}

pub fn referent(heap: &HeapMemory, reference: ObjectReference) -> Option<ObjectReference> {
    debug_assert!(shape(heap, reference).flags & SOFT_REFERENCE != 0);
    heap.load_reference(data_slot(heap, reference, 0))
}

pub fn set_referent(heap: &HeapMemory, reference: ObjectReference, referent: Option<ObjectReference>) {
    debug_assert!(shape(heap, reference).flags & SOFT_REFERENCE != 0);
    heap.store_reference(data_slot(heap, reference, 0), referent)
}

/// Visit the reference slots of an object.
pub fn for_each_ref_slot(heap: &HeapMemory, object: ObjectReference, mut f: impl FnMut(Address)) {
    let refs = shape(heap, object).refs;
    for i in 0..refs {
        f(ref_slot(object, i));
    }
}

static_assertions::const_assert_eq!(bytes_for(0, 0), 3 * BYTES_IN_WORD);

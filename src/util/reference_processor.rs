use crate::util::log;
use crate::util::memory::HeapMemory;
use crate::util::ObjectReference;
use crate::vm::{ReferenceGlue, VMBinding};
use std::sync::Mutex;

/// Keeps the soft references the runtime registered.
///
/// A soft reference keeps its referent alive while memory is plentiful.
/// Tracing plans retain the referents of live references unless the
/// collector decided to clear soft references, and then clear the referents
/// that did not survive. Reference counting plans never count the referent
/// edge, so a referent is cleared once its count frees it.
pub struct ReferenceProcessor {
    references: Mutex<Vec<ObjectReference>>,
}

impl ReferenceProcessor {
    const INITIAL_SIZE: usize = 256;

    pub fn new() -> Self {
        ReferenceProcessor {
            references: Mutex::new(Vec::with_capacity(Self::INITIAL_SIZE)),
        }
    }

    /// Register `reference` as a soft reference to `referent`.
    pub fn add_soft_candidate<VM: VMBinding>(
        &self,
        heap: &HeapMemory,
        reference: ObjectReference,
        referent: ObjectReference,
    ) {
        VM::VMReferenceGlue::set_referent(heap, reference, referent);
        self.references.lock().unwrap().push(reference);
    }

    /// The number of registered references.
    pub fn count(&self) -> usize {
        self.references.lock().unwrap().len()
    }

    /// Trace the referents of references that are live so far. `trace`
    /// keeps an object alive and returns its new location.
    pub fn retain<VM: VMBinding>(
        &self,
        heap: &HeapMemory,
        is_live: impl Fn(ObjectReference) -> bool,
        get_forwarded: impl Fn(ObjectReference) -> ObjectReference,
        mut trace: impl FnMut(ObjectReference) -> ObjectReference,
    ) {
        let references = self.references.lock().unwrap();
        let mut retained = 0;
        for &reference in references.iter() {
            if !is_live(reference) {
                continue;
            }
            let reference = get_forwarded(reference);
            if let Some(referent) = VM::VMReferenceGlue::get_referent(heap, reference) {
                let new_referent = trace(referent);
                VM::VMReferenceGlue::set_referent(heap, reference, new_referent);
                retained += 1;
            }
        }
        log::debug!("Retained {} soft referents", retained);
    }

    /// Called once the liveness of every object is known. Dead references are
    /// dropped, referents that died are cleared, and the survivors are
    /// updated to their new locations. Returns the number of cleared referents.
    pub fn process<VM: VMBinding>(
        &self,
        heap: &HeapMemory,
        is_live: impl Fn(ObjectReference) -> bool,
        get_forwarded: impl Fn(ObjectReference) -> ObjectReference,
    ) -> usize {
        let mut references = self.references.lock().unwrap();
        let before = references.len();
        let mut cleared = 0;
        let survivors: Vec<ObjectReference> = references
            .iter()
            .filter(|&&reference| is_live(reference))
            .map(|&reference| get_forwarded(reference))
            .filter(|&reference| match VM::VMReferenceGlue::get_referent(heap, reference) {
                Some(referent) if is_live(referent) => {
                    VM::VMReferenceGlue::set_referent(heap, reference, get_forwarded(referent));
                    true
                }
                Some(referent) => {
                    log::trace!("Clearing {} -> {}", reference, referent);
                    VM::VMReferenceGlue::clear_referent(heap, reference);
                    cleared += 1;
                    false
                }
                None => false,
            })
            .collect();
        log::debug!(
            "Soft references: {} registered, {} kept, {} referents cleared",
            before,
            survivors.len(),
            cleared
        );
        *references = survivors;
        cleared
    }
}

impl Default for ReferenceProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::{BYTES_IN_PAGE, HEAP_START};
    use crate::util::test_util::mock_vm::{object, MockVM};
    use std::collections::HashSet;

    fn new_object(heap: &HeapMemory, index: usize, soft: bool) -> ObjectReference {
        let bytes = object::bytes_for(0, 1);
        let o = ObjectReference::from_raw_address(HEAP_START + index * bytes).unwrap();
        let flags = if soft { object::SOFT_REFERENCE } else { 0 };
        object::write_shape(heap, o, object::Shape::new(0, 1, flags));
        o
    }

    #[test]
    fn dead_referents_are_cleared() {
        let heap = HeapMemory::new(HEAP_START, BYTES_IN_PAGE);
        let rp = ReferenceProcessor::new();
        let r1 = new_object(&heap, 0, true);
        let r2 = new_object(&heap, 1, true);
        let dead_ref = new_object(&heap, 2, true);
        let x = new_object(&heap, 3, false);
        let y = new_object(&heap, 4, false);
        rp.add_soft_candidate::<MockVM>(&heap, r1, x);
        rp.add_soft_candidate::<MockVM>(&heap, r2, y);
        rp.add_soft_candidate::<MockVM>(&heap, dead_ref, x);

        let live: HashSet<ObjectReference> = [r1, r2, x].into_iter().collect();
        let cleared = rp.process::<MockVM>(&heap, |o| live.contains(&o), |o| o);
        assert_eq!(cleared, 1);
        assert_eq!(rp.count(), 1);
        assert_eq!(object::referent(&heap, r1), Some(x));
        assert_eq!(object::referent(&heap, r2), None);
    }

    #[test]
    fn retained_referents_are_traced() {
        let heap = HeapMemory::new(HEAP_START, BYTES_IN_PAGE);
        let rp = ReferenceProcessor::new();
        let r = new_object(&heap, 0, true);
        let x = new_object(&heap, 1, false);
        let moved = new_object(&heap, 2, false);
        rp.add_soft_candidate::<MockVM>(&heap, r, x);

        let mut traced = vec![];
        rp.retain::<MockVM>(
            &heap,
            |o| o == r,
            |o| o,
            |o| {
                traced.push(o);
                moved
            },
        );
        assert_eq!(traced, vec![x]);
        assert_eq!(object::referent(&heap, r), Some(moved));
    }
}

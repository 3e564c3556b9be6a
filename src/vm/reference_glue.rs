use crate::util::memory::HeapMemory;
use crate::util::ObjectReference;
use crate::vm::VMBinding;

/// Access to the referent of a soft reference object. The referent field is
/// not reported by [`crate::vm::ObjectModel::scan_object`], so the collector
/// decides whether it keeps the referent alive.
pub trait ReferenceGlue<VM: VMBinding> {
    fn get_referent(heap: &HeapMemory, reference: ObjectReference) -> Option<ObjectReference>;

    fn set_referent(heap: &HeapMemory, reference: ObjectReference, referent: ObjectReference);

    fn clear_referent(heap: &HeapMemory, reference: ObjectReference);
}

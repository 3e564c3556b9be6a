use crate::util::memory::HeapMemory;
use crate::util::ObjectReference;
use crate::vm::scanning::SlotVisitor;
use crate::vm::VMBinding;

/// Queries about the layout of objects. Every object starts with the GC
/// header ([`crate::util::header::GC_HEADER_BYTES`]); what follows is up to
/// the runtime.
pub trait ObjectModel<VM: VMBinding> {
    /// The size of the object in bytes, including the GC header.
    fn get_current_size(heap: &HeapMemory, object: ObjectReference) -> usize;

    /// The alignment an object needs when it is copied.
    fn get_align_when_copied(_heap: &HeapMemory, _object: ObjectReference) -> usize {
        VM::MIN_ALIGNMENT
    }

    /// Is the object an array of references?
    fn is_reference_array(heap: &HeapMemory, object: ObjectReference) -> bool;

    /// Report the address of every reference slot of the object.
    fn scan_object(heap: &HeapMemory, object: ObjectReference, visitor: &mut dyn SlotVisitor);

    /// Can the object never be part of a cycle? Acyclic objects are green
    /// and never become cycle candidates.
    fn is_acyclic(_heap: &HeapMemory, _object: ObjectReference) -> bool {
        false
    }

    /// Print the object for debugging.
    fn dump_object(heap: &HeapMemory, object: ObjectReference) -> String {
        format!(
            "{} [{:#x} {:#x}] size={}",
            object,
            heap.load(object.word(0)),
            heap.load(object.word(1)),
            Self::get_current_size(heap, object)
        )
    }
}

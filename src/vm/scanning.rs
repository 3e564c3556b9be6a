use crate::util::opaque_pointer::VMMutatorThread;
use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;

/// Callback trait of object scanning. The visitor receives the address of
/// each reference slot, which may hold null.
pub trait SlotVisitor {
    fn visit_slot(&mut self, slot: Address);
}

/// This lets us use closures as SlotVisitor.
impl<F: FnMut(Address)> SlotVisitor for F {
    fn visit_slot(&mut self, slot: Address) {
        self(slot)
    }
}

/// Callback trait of root scanning. Roots live outside the heap, so the
/// visitor gets them by reference and a moving collector updates them in place.
pub trait RootVisitor {
    fn visit_root(&mut self, root: &mut ObjectReference);
}

/// This lets us use closures as RootVisitor.
impl<F: FnMut(&mut ObjectReference)> RootVisitor for F {
    fn visit_root(&mut self, root: &mut ObjectReference) {
        self(root)
    }
}

pub trait Scanning<VM: VMBinding> {
    /// Report the roots held by one mutator thread (its stack and registers).
    /// Called while the mutator is stopped.
    fn scan_roots_in_mutator_thread(tls: VMMutatorThread, visitor: &mut dyn RootVisitor);

    /// Report the roots that do not belong to any mutator, such as globals.
    fn scan_vm_specific_roots(visitor: &mut dyn RootVisitor);
}

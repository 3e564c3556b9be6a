//! A small runtime for testing the collector.
//!
//! Objects follow the layout in [`object`]. Roots are kept in process-wide
//! registries: one list per mutator thread plus a list of global roots. The
//! collector updates the registries when it moves objects, so a test must
//! read its roots back after a GC. Collector threads are plain `std::thread`s.
//!
//! The registries are shared by every test in the process, so tests that use
//! them go through [`with_mockvm`], which runs them one at a time and resets
//! the registries before each.

pub mod object;

use crate::memory_manager;
use crate::util::alloc::AllocationError;
use crate::util::memory::HeapMemory;
use crate::util::opaque_pointer::*;
use crate::util::ObjectReference;
use crate::vm::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockVM;

impl VMBinding for MockVM {
    type VMObjectModel = MockVM;
    type VMScanning = MockVM;
    type VMCollection = MockVM;
    type VMReferenceGlue = MockVM;
}

lazy_static! {
    static ref THREAD_ROOTS: Mutex<HashMap<VMMutatorThread, Vec<ObjectReference>>> = Mutex::default();
    static ref GLOBAL_ROOTS: Mutex<Vec<ObjectReference>> = Mutex::default();
    static ref OOM_ERRORS: Mutex<Vec<AllocationError>> = Mutex::default();
}

static NEXT_THREAD_ID: AtomicUsize = AtomicUsize::new(1);

/// A fresh mutator thread handle.
pub fn new_mutator_tls() -> VMMutatorThread {
    VMMutatorThread(VMThread::from_usize(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed)))
}

pub fn add_thread_root(tls: VMMutatorThread, object: ObjectReference) {
    THREAD_ROOTS.lock().unwrap().entry(tls).or_default().push(object);
}

pub fn thread_roots(tls: VMMutatorThread) -> Vec<ObjectReference> {
    THREAD_ROOTS.lock().unwrap().get(&tls).cloned().unwrap_or_default()
}

pub fn set_thread_roots(tls: VMMutatorThread, roots: Vec<ObjectReference>) {
    THREAD_ROOTS.lock().unwrap().insert(tls, roots);
}

pub fn add_global_root(object: ObjectReference) {
    GLOBAL_ROOTS.lock().unwrap().push(object);
}

pub fn global_roots() -> Vec<ObjectReference> {
    GLOBAL_ROOTS.lock().unwrap().clone()
}

pub fn set_global_roots(roots: Vec<ObjectReference>) {
    *GLOBAL_ROOTS.lock().unwrap() = roots;
}

/// The out of memory errors reported so far.
pub fn oom_errors() -> Vec<AllocationError> {
    OOM_ERRORS.lock().unwrap().clone()
}

/// Forget all roots and errors.
pub fn reset() {
    THREAD_ROOTS.lock().unwrap_or_else(|p| p.into_inner()).clear();
    GLOBAL_ROOTS.lock().unwrap_or_else(|p| p.into_inner()).clear();
    OOM_ERRORS.lock().unwrap_or_else(|p| p.into_inner()).clear();
}

/// Run a test that uses the registries, with a clean state, one test at a time.
pub fn with_mockvm<T>(test: T)
where
    T: FnOnce() + std::panic::UnwindSafe,
{
    super::serial_test(|| {
        reset();
        super::with_cleanup(test, reset);
    })
}

impl ObjectModel<MockVM> for MockVM {
    fn get_current_size(heap: &HeapMemory, object: ObjectReference) -> usize {
        object::size(heap, object)
    }

    fn is_reference_array(heap: &HeapMemory, object: ObjectReference) -> bool {
        object::shape(heap, object).flags & object::REF_ARRAY != 0
    }

    fn scan_object(heap: &HeapMemory, object: ObjectReference, visitor: &mut dyn SlotVisitor) {
        object::for_each_ref_slot(heap, object, |slot| visitor.visit_slot(slot));
    }

    fn is_acyclic(heap: &HeapMemory, object: ObjectReference) -> bool {
        object::shape(heap, object).flags & object::ACYCLIC != 0
    }
}

impl Scanning<MockVM> for MockVM {
    fn scan_roots_in_mutator_thread(tls: VMMutatorThread, visitor: &mut dyn RootVisitor) {
        // Take the roots out, so the lock is not held while tracing.
        let mut roots = THREAD_ROOTS.lock().unwrap().remove(&tls).unwrap_or_default();
        for root in roots.iter_mut() {
            visitor.visit_root(root);
        }
        THREAD_ROOTS.lock().unwrap().insert(tls, roots);
    }

    fn scan_vm_specific_roots(visitor: &mut dyn RootVisitor) {
        let mut roots = std::mem::take(&mut *GLOBAL_ROOTS.lock().unwrap());
        for root in roots.iter_mut() {
            visitor.visit_root(root);
        }
        *GLOBAL_ROOTS.lock().unwrap() = roots;
    }
}

impl Collection<MockVM> for MockVM {
    fn spawn_gc_thread(_tls: VMThread, ctx: GCThreadContext<MockVM>) {
        let GCThreadContext::Collector(mut collector) = ctx;
        let name = format!("collector-{}", collector.ordinal);
        std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                let tls = VMWorkerThread(VMThread::from_usize(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed)));
                memory_manager::start_collector(tls, &mut collector);
            })
            .unwrap();
    }

    fn out_of_memory(_tls: VMThread, err_kind: AllocationError) {
        OOM_ERRORS.lock().unwrap().push(err_kind);
    }
}

impl ReferenceGlue<MockVM> for MockVM {
    fn get_referent(heap: &HeapMemory, reference: ObjectReference) -> Option<ObjectReference> {
        object::referent(heap, reference)
    }

    fn set_referent(heap: &HeapMemory, reference: ObjectReference, referent: ObjectReference) {
        object::set_referent(heap, reference, Some(referent))
    }

    fn clear_referent(heap: &HeapMemory, reference: ObjectReference) {
        object::set_referent(heap, reference, None)
    }
}


//! Write barriers.
//!
//! Mutators call the barrier around every store of a reference into a heap
//! object. The fast path only tests the log state of the source object.
//! The first store into an unlogged object after a GC takes the slow path,
//! which claims the log state and records the object in a buffer that the
//! next GC processes.

use crate::util::deque::{LocalDeque, SharedDeque};
use crate::util::header::status;
use crate::util::memory::HeapMemory;
use crate::util::statistics::Stats;
use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, VMBinding};
use downcast_rs::Downcast;
use std::marker::PhantomData;
use std::sync::Arc;

/// BarrierSelector describes which barrier to use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BarrierSelector {
    /// No barrier is used.
    NoBarrier,
    /// Remember modified objects so a nursery GC can find pointers into the nursery.
    ObjectBarrier,
    /// Coalescing reference counting: snapshot the referents of modified
    /// objects as decrements, and remember the objects so that their new
    /// referents get increments.
    RCBarrier,
}

impl BarrierSelector {
    pub const fn equals(&self, other: BarrierSelector) -> bool {
        // cast enum to u8 then compare. Otherwise, we cannot do it in a const fn.
        *self as u8 == other as u8
    }
}

/// A barrier is a combination of fast-path behaviors + slow-path semantics.
/// This trait exposes generic barrier interfaces. The implementations will define their
/// own fast-path code and slow-path semantics.
///
/// Normally, a binding will call these generic barrier interfaces (`object_reference_write` and `memory_region_copy`) for subsuming barrier calls.
pub trait Barrier<VM: VMBinding>: 'static + Send + Downcast {
    /// Hand recorded entries to the shared buffers. Called before a GC.
    fn flush(&mut self) {}

    /// Subsuming barrier for object reference write
    fn object_reference_write(
        &mut self,
        heap: &HeapMemory,
        src: ObjectReference,
        slot: Address,
        target: Option<ObjectReference>,
    ) {
        self.object_reference_write_pre(heap, src, slot, target);
        heap.store_reference(slot, target);
        self.object_reference_write_post(heap, src, slot, target);
    }

    /// Full pre-barrier for object reference write
    fn object_reference_write_pre(
        &mut self,
        _heap: &HeapMemory,
        _src: ObjectReference,
        _slot: Address,
        _target: Option<ObjectReference>,
    ) {
    }

    /// Full post-barrier for object reference write
    fn object_reference_write_post(
        &mut self,
        _heap: &HeapMemory,
        _src: ObjectReference,
        _slot: Address,
        _target: Option<ObjectReference>,
    ) {
    }

    /// Object reference write slow-path call.
    /// This can be called either before or after the store, depend on the concrete barrier implementation.
    fn object_reference_write_slow(
        &mut self,
        _heap: &HeapMemory,
        _src: ObjectReference,
        _slot: Address,
        _target: Option<ObjectReference>,
    ) {
    }

    /// Barrier before a bulk copy of `count` reference slots into `dst`.
    fn memory_region_copy_pre(&mut self, _heap: &HeapMemory, _dst: ObjectReference, _dst_slot: Address, _count: usize) {}

    /// Barrier after a bulk copy of `count` reference slots into `dst`.
    fn memory_region_copy_post(&mut self, _heap: &HeapMemory, _dst: ObjectReference, _dst_slot: Address, _count: usize) {}
}

impl_downcast!(Barrier<VM> where VM: VMBinding);

/// Empty barrier implementation.
/// For GCs that do not need barriers.
pub struct NoBarrier;

impl<VM: VMBinding> Barrier<VM> for NoBarrier {}

/// Claim the log state of `src`. Returns true if the caller must record it.
/// A thread that loses the race waits for the winner to finish, so no store
/// becomes visible before the object is recorded.
fn log_object(heap: &HeapMemory, src: ObjectReference) -> bool {
    if status::attempt_to_log(heap, src) {
        true
    } else {
        status::spin_while_being_logged(heap, src);
        false
    }
}

/// Object remembering barrier. Records each modified mature object once
/// between two GCs in the mod buffer (the remembered set of a
/// generational plan).
pub struct ObjectRememberingBarrier<VM: VMBinding> {
    modbuf: LocalDeque,
    stats: Arc<Stats>,
    p: PhantomData<VM>,
}

impl<VM: VMBinding> ObjectRememberingBarrier<VM> {
    pub fn new(modbuf: Arc<SharedDeque>, stats: Arc<Stats>) -> Self {
        Self {
            modbuf: LocalDeque::new(modbuf),
            stats,
            p: PhantomData,
        }
    }

    #[cold]
    fn object_reference_write_slow_inner(&mut self, heap: &HeapMemory, src: ObjectReference) {
        if log_object(heap, src) {
            self.stats.barrier_slow_path.inc();
            self.modbuf.push(src);
            status::make_logged(heap, src);
        }
    }
}

impl<VM: VMBinding> Barrier<VM> for ObjectRememberingBarrier<VM> {
    fn flush(&mut self) {
        self.modbuf.flush();
    }

    #[inline(always)]
    fn object_reference_write_pre(
        &mut self,
        heap: &HeapMemory,
        src: ObjectReference,
        _slot: Address,
        _target: Option<ObjectReference>,
    ) {
        if status::is_unlogged(heap, src) {
            self.object_reference_write_slow_inner(heap, src);
        }
    }

    fn object_reference_write_slow(
        &mut self,
        heap: &HeapMemory,
        src: ObjectReference,
        _slot: Address,
        _target: Option<ObjectReference>,
    ) {
        self.object_reference_write_slow_inner(heap, src);
    }

    fn memory_region_copy_pre(&mut self, heap: &HeapMemory, dst: ObjectReference, _dst_slot: Address, _count: usize) {
        if status::is_unlogged(heap, dst) {
            self.object_reference_write_slow_inner(heap, dst);
        }
    }
}

/// The coalescing barrier of the reference counting plans. The first store
/// into an object after a GC pushes every referent the object has at that
/// moment to the dec buffer, and the object to the mod buffer. At the next
/// GC the referents the object has then are incremented. Intermediate
/// stores cost nothing.
pub struct RCBarrier<VM: VMBinding> {
    modbuf: LocalDeque,
    decbuf: LocalDeque,
    stats: Arc<Stats>,
    p: PhantomData<VM>,
}

impl<VM: VMBinding> RCBarrier<VM> {
    pub fn new(modbuf: Arc<SharedDeque>, decbuf: Arc<SharedDeque>, stats: Arc<Stats>) -> Self {
        Self {
            modbuf: LocalDeque::new(modbuf),
            decbuf: LocalDeque::new(decbuf),
            stats,
            p: PhantomData,
        }
    }

    /// Record a new object. Its referents are counted at the next GC. A
    /// `counted` object starts with one increment, which is balanced by a
    /// buffered decrement.
    pub fn record_new_object(&mut self, object: ObjectReference, counted: bool) {
        self.modbuf.push(object);
        if counted {
            self.decbuf.push(object);
        }
    }

    #[cold]
    fn object_reference_write_slow_inner(&mut self, heap: &HeapMemory, src: ObjectReference) {
        if log_object(heap, src) {
            self.stats.barrier_slow_path.inc();
            let decbuf = &mut self.decbuf;
            VM::VMObjectModel::scan_object(heap, src, &mut |slot: Address| {
                if let Some(old) = heap.load_reference(slot) {
                    decbuf.push(old);
                }
            });
            self.modbuf.push(src);
            status::make_logged(heap, src);
        }
    }
}

impl<VM: VMBinding> Barrier<VM> for RCBarrier<VM> {
    fn flush(&mut self) {
        self.modbuf.flush();
        self.decbuf.flush();
    }

    #[inline(always)]
    fn object_reference_write_pre(
        &mut self,
        heap: &HeapMemory,
        src: ObjectReference,
        _slot: Address,
        _target: Option<ObjectReference>,
    ) {
        if status::is_unlogged(heap, src) {
            self.object_reference_write_slow_inner(heap, src);
        }
    }

    fn object_reference_write_slow(
        &mut self,
        heap: &HeapMemory,
        src: ObjectReference,
        _slot: Address,
        _target: Option<ObjectReference>,
    ) {
        self.object_reference_write_slow_inner(heap, src);
    }

    fn memory_region_copy_pre(&mut self, heap: &HeapMemory, dst: ObjectReference, _dst_slot: Address, _count: usize) {
        if status::is_unlogged(heap, dst) {
            self.object_reference_write_slow_inner(heap, dst);
        }
    }
}

//! The functions in this module are the API a runtime uses to talk to the
//! collector: create an instance, bind mutator threads, allocate, run the
//! write barrier and ask for collections.
//!
//! A runtime creates one [`MMTK`] instance with [`mmtk_init`], leaks it (or
//! keeps it in a static), and calls [`initialize_collection`] once it can
//! spawn threads. Each application thread then calls [`bind_mutator`] and
//! uses the returned [`Mutator`] for every allocation and barrier.
//!
//! Functions that may park the calling thread ([`yieldpoint`],
//! [`handle_user_collection_request`], [`trigger_collection`] and
//! [`harness_begin`]) must only be called from a thread with a bound mutator.

use crate::build_info;
use crate::mmtk::{MMTKBuilder, MMTK};
use crate::plan::{AllocationHint, AllocationSemantics, Mutator, TriggerReason};
use crate::scheduler::CollectorContext;
use crate::util::alloc::AllocatorSelector;
use crate::util::constants::LOG_BYTES_IN_PAGE;
use crate::util::header::{self, HeaderWord, GC_HEADER_BYTES};
use crate::util::log;
use crate::util::memory::HeapMemory;
use crate::util::opaque_pointer::*;
use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;

/// Initialize an MMTK instance. A VM should call this method after creating an
/// [`MMTKBuilder`] and setting its options. The logger is initialized here
/// unless the `builtin_env_logger` feature is disabled.
///
/// Arguments:
/// * `builder`: The reference to a MMTk builder.
pub fn mmtk_init<VM: VMBinding>(builder: &MMTKBuilder) -> Box<MMTK<VM>> {
    match crate::util::logger::try_init() {
        Ok(_) => log::debug!("The built-in env_logger is initialized"),
        Err(_) => log::debug!("A logger was already set up by the runtime"),
    }
    let mmtk = builder.build();
    log::info!("Initialized {} with plan {:?}", *build_info::ULTERIOR_FULL_BUILD_INFO, mmtk.options.plan);
    log::info!("Heap bound: {:?}", mmtk.options.gc_trigger);
    Box::new(mmtk)
}

/// Spawn the collector threads and allow collections. Before this is called,
/// an allocation that needs a GC fails with out of memory.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread that wants to enable the collection. This value will be passed back
///   to the VM in [`crate::vm::Collection::spawn_gc_thread`] so that the VM knows the
///   context.
pub fn initialize_collection<VM: VMBinding>(mmtk: &'static MMTK<VM>, tls: VMThread) {
    mmtk.initialize_collection(tls);
}

/// Request the collector to create a mutator for the thread `tls`. The mutator
/// is registered with the collectors; if a GC is in progress, this waits for
/// it to finish.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread that will be associated with the mutator.
pub fn bind_mutator<VM: VMBinding>(mmtk: &'static MMTK<VM>, tls: VMMutatorThread) -> Box<Mutator<VM>> {
    let mut mutator = crate::plan::create_mutator(tls, mmtk);
    mmtk.register_mutator(&mut mutator);
    log::trace!("Bound mutator {:?}\n{:?}", tls, mutator.config);
    mutator
}

/// Report to the collector that a mutator is no longer needed. Buffered
/// barrier entries are handed over first, so no decrement is lost.
///
/// Arguments:
/// * `mutator`: A reference to the mutator to be destroyed.
pub fn destroy_mutator<VM: VMBinding>(mut mutator: Box<Mutator<VM>>) {
    mutator.on_destroy();
    let mmtk = mutator.mmtk;
    mmtk.unregister_mutator(&mut mutator);
}

/// Flush the mutator local buffers.
///
/// Arguments:
/// * `mutator`: A reference to the mutator.
pub fn flush_mutator<VM: VMBinding>(mutator: &mut Mutator<VM>) {
    mutator.flush()
}

/// Allocate memory for an object. The returned address is zero if the heap
/// is out of memory, after [`crate::vm::Collection::out_of_memory`] was called.
///
/// Arguments:
/// * `mutator`: The mutator to perform this allocation request.
/// * `size`: The number of bytes required for the object, including the GC header.
/// * `align`: Required alignment for the object.
/// * `offset`: Offset associated with the alignment.
/// * `semantics`: The allocation semantic required for the allocation.
pub fn alloc<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    size: usize,
    align: usize,
    offset: usize,
    semantics: AllocationSemantics,
) -> Address {
    alloc_with_hint(mutator, size, align, offset, semantics, AllocationHint::None)
}

/// Allocate memory for an object, with a hint about its expected lifetime.
/// [`AllocationHint::Pretenure`] sends a default allocation straight to the
/// mature space of a generational plan.
///
/// Arguments:
/// * `mutator`: The mutator to perform this allocation request.
/// * `size`: The number of bytes required for the object, including the GC header.
/// * `align`: Required alignment for the object.
/// * `offset`: Offset associated with the alignment.
/// * `semantics`: The allocation semantic required for the allocation.
/// * `hint`: The expected lifetime of the object.
pub fn alloc_with_hint<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    size: usize,
    align: usize,
    offset: usize,
    semantics: AllocationSemantics,
    hint: AllocationHint,
) -> Address {
    // Every object carries the GC header, so nothing smaller can be an object.
    debug_assert!(size >= GC_HEADER_BYTES, "{} bytes cannot hold the GC header", size);
    debug_assert!(align >= VM::MIN_ALIGNMENT && align <= VM::MAX_ALIGNMENT);
    mutator.alloc(size, align, offset, semantics, hint)
}

/// Perform post-allocation actions: initialize the GC header and, for
/// reference counting plans, record the object with the barrier. Must be
/// called once the runtime has written the object's own header, and before
/// the object is published or the thread reaches a yieldpoint.
///
/// Arguments:
/// * `mutator`: The mutator to perform post-alloc actions.
/// * `refer`: The newly allocated object.
/// * `bytes`: The size of the space allocated for the object (in bytes).
/// * `semantics`: The allocation semantics used for the allocation.
pub fn post_alloc<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    refer: ObjectReference,
    bytes: usize,
    semantics: AllocationSemantics,
) {
    mutator.post_alloc(refer, bytes, semantics);
}

/// The *subsuming* write barrier: store `target` into `slot` of `src`, and
/// do whatever the plan's barrier needs around the store.
///
/// Arguments:
/// * `mutator`: The mutator for the current thread.
/// * `src`: The modified source object.
/// * `slot`: The location of the field to be modified.
/// * `target`: The target for the write operation, or `None` to store null.
pub fn object_reference_write<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    src: ObjectReference,
    slot: Address,
    target: Option<ObjectReference>,
) {
    let plan = mutator.plan;
    let heap = &plan.base().heap;
    mutator.barrier.object_reference_write(heap, src, slot, target);
}

/// The *pre* write barrier, for runtimes that do the store themselves. It
/// must be paired with [`object_reference_write_post`].
///
/// Arguments:
/// * `mutator`: The mutator for the current thread.
/// * `src`: The modified source object.
/// * `slot`: The location of the field to be modified.
/// * `target`: The target for the write operation.
pub fn object_reference_write_pre<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    src: ObjectReference,
    slot: Address,
    target: Option<ObjectReference>,
) {
    let plan = mutator.plan;
    let heap = &plan.base().heap;
    mutator.barrier.object_reference_write_pre(heap, src, slot, target);
}

/// The *post* write barrier, called after the runtime's own store.
///
/// Arguments:
/// * `mutator`: The mutator for the current thread.
/// * `src`: The modified source object.
/// * `slot`: The location of the field to be modified.
/// * `target`: The target for the write operation.
pub fn object_reference_write_post<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    src: ObjectReference,
    slot: Address,
    target: Option<ObjectReference>,
) {
    let plan = mutator.plan;
    let heap = &plan.base().heap;
    mutator.barrier.object_reference_write_post(heap, src, slot, target);
}

/// The *subsuming* memory region copy barrier. Copies `count` reference
/// slots starting at `src_slot` into `dst` starting at `dst_slot`, for
/// example for an array copy. The ranges must not overlap.
///
/// Arguments:
/// * `mutator`: The mutator for the current thread.
/// * `src_slot`: The first slot to copy from.
/// * `dst`: The object that receives the references.
/// * `dst_slot`: The first slot to copy to.
/// * `count`: The number of reference slots.
pub fn memory_region_copy<VM: VMBinding>(
    mutator: &mut Mutator<VM>,
    src_slot: Address,
    dst: ObjectReference,
    dst_slot: Address,
    count: usize,
) {
    if count == 0 {
        return;
    }
    let plan = mutator.plan;
    let heap = &plan.base().heap;
    mutator.barrier.memory_region_copy_pre(heap, dst, dst_slot, count);
    heap.copy(src_slot, dst_slot, count << crate::util::constants::LOG_BYTES_IN_WORD);
    mutator.barrier.memory_region_copy_post(heap, dst, dst_slot, count);
}

/// Return the allocator that serves an allocation semantic. This method is
/// provided so that a runtime can generate its own allocation fast-path.
///
/// Arguments:
/// * `mmtk`: The reference to an MMTk instance.
/// * `semantics`: The allocation semantic to query.
pub fn get_allocator_mapping<VM: VMBinding>(mmtk: &MMTK<VM>, semantics: AllocationSemantics) -> AllocatorSelector {
    crate::plan::allocator_mapping(mmtk.options.plan)[semantics]
}

/// A yieldpoint. The thread parks here while the collectors have stopped the world.
///
/// Arguments:
/// * `mutator`: The mutator for the current thread.
pub fn yieldpoint<VM: VMBinding>(mutator: &mut Mutator<VM>) {
    mutator.mmtk.monitor.yieldpoint();
}

/// The thread is about to do something that may take a long time and
/// touches no heap objects, such as blocking I/O. The collectors do not
/// wait for it until [`leave_gc_safe_region`] is called.
pub fn enter_gc_safe_region<VM: VMBinding>(mutator: &mut Mutator<VM>) {
    mutator.flush();
    mutator.mmtk.monitor.enter_gc_safe_region();
}

/// The thread is back. Parks if a GC is in progress.
pub fn leave_gc_safe_region<VM: VMBinding>(mutator: &mut Mutator<VM>) {
    mutator.mmtk.monitor.leave_gc_safe_region();
}

/// Return used memory in bytes.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn used_bytes<VM: VMBinding>(mmtk: &MMTK<VM>) -> usize {
    mmtk.get_plan().get_used_pages() << LOG_BYTES_IN_PAGE
}

/// Return free memory in bytes.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn free_bytes<VM: VMBinding>(mmtk: &MMTK<VM>) -> usize {
    mmtk.get_plan().get_free_pages() << LOG_BYTES_IN_PAGE
}

/// Return the total memory in bytes, which is the current heap bound.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn total_bytes<VM: VMBinding>(mmtk: &MMTK<VM>) -> usize {
    mmtk.get_plan().get_total_pages() << LOG_BYTES_IN_PAGE
}

/// The arena all objects live in. Runtimes read and write object fields through it.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn heap<VM: VMBinding>(mmtk: &MMTK<VM>) -> &HeapMemory {
    &mmtk.get_plan().base().heap
}

/// Is the object live? An object the collector freed or did not reach in
/// the last GC is not. Meaningful for any object that was allocated through
/// the collector and not yet reused.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `object`: The object to check.
pub fn is_live_object<VM: VMBinding>(mmtk: &MMTK<VM>, object: ObjectReference) -> bool {
    mmtk.get_plan().is_live(object)
}

/// Read a word of the GC header of an object.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `object`: The object.
/// * `which`: The header word to read.
pub fn read_bits<VM: VMBinding>(mmtk: &MMTK<VM>, object: ObjectReference, which: HeaderWord) -> usize {
    header::read_bits(heap(mmtk), object, which)
}

/// Replace a word of the GC header of an object if it still holds
/// `expected`. Returns whether the word was replaced.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `object`: The object.
/// * `which`: The header word to update.
/// * `expected`: The value the word must hold.
/// * `new`: The value to store.
pub fn compare_and_set_bits<VM: VMBinding>(
    mmtk: &MMTK<VM>,
    object: ObjectReference,
    which: HeaderWord,
    expected: usize,
    new: usize,
) -> bool {
    header::compare_and_set_bits(heap(mmtk), object, which, expected, new)
}

/// Trigger a garbage collection as requested by the user, and wait for it.
/// Ignored if the option `ignore_system_gc` is set and `force` is false.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread that triggers this collection request.
/// * `force`: Collect even if the runtime asked to ignore user requests.
pub fn handle_user_collection_request<VM: VMBinding>(mmtk: &MMTK<VM>, tls: VMMutatorThread, force: bool) {
    mmtk.handle_user_collection_request(tls, force);
}

/// Trigger a garbage collection for `reason` and wait for it to complete.
///
/// Arguments:
/// * `mutator`: The mutator for the current thread.
/// * `reason`: Why the collection is needed.
pub fn trigger_collection<VM: VMBinding>(mutator: &mut Mutator<VM>, reason: TriggerReason) {
    let plan = mutator.plan;
    let epoch = plan.base().gc_requester.request(reason);
    mutator.block_for_gc(epoch);
}

/// Ask for a garbage collection without waiting for it. The mutators stop at
/// their next yieldpoint. Returns false if collection is not initialized yet.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn trigger_async_collection<VM: VMBinding>(mmtk: &MMTK<VM>) -> bool {
    if !mmtk.state.is_initialized() {
        return false;
    }
    let epoch = mmtk.request_async_collection();
    log::debug!("Requested GC epoch {} asynchronously", epoch);
    true
}

/// The entry point of a collector thread. The runtime calls this from the
/// thread it spawned in [`crate::vm::Collection::spawn_gc_thread`]. Never returns.
///
/// Arguments:
/// * `tls`: The thread that will be used as the collector thread.
/// * `context`: The context the collector was spawned with.
pub fn start_collector<VM: VMBinding>(tls: VMWorkerThread, context: &mut CollectorContext<VM>) {
    context.run(tls);
}

/// Register a soft reference. `reference` is an object the runtime treats
/// as a soft reference; its referent is set to `referent` through
/// [`crate::vm::ReferenceGlue::set_referent`]. The referent is cleared once
/// the collector decides it is dead.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `reference`: The soft reference object.
/// * `referent`: The object it refers to.
pub fn add_soft_candidate<VM: VMBinding>(mmtk: &MMTK<VM>, reference: ObjectReference, referent: ObjectReference) {
    mmtk.reference_processor
        .add_soft_candidate::<VM>(heap(mmtk), reference, referent);
}

/// Generic hook to allow benchmarks to be harnessed. Collects the heap, then
/// starts counting statistics. Call it from a mutator thread.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
/// * `tls`: The thread that calls the function.
pub fn harness_begin<VM: VMBinding>(mmtk: &MMTK<VM>, tls: VMMutatorThread) {
    mmtk.harness_begin(tls);
}

/// Generic hook to allow benchmarks to be harnessed. Stops counting and
/// prints the statistics.
///
/// Arguments:
/// * `mmtk`: A reference to an MMTk instance.
pub fn harness_end<VM: VMBinding>(mmtk: &MMTK<VM>) {
    mmtk.harness_end();
}

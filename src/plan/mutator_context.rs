//! Mutator context for each application thread.

use crate::mmtk::MMTK;
use crate::plan::barriers::Barrier;
use crate::plan::global::{AllocationHint, AllocationSemantics, Plan, MAX_COLLECTION_ATTEMPTS, OUT_OF_MEMORY_THRESHOLD};
use crate::plan::TriggerReason;
use crate::policy::space::Space;
use crate::util::alloc::{AllocationError, Allocator, AllocatorSelector, Allocators};
use crate::util::conversions;
use crate::util::log;
use crate::util::opaque_pointer::*;
use crate::util::{Address, ObjectReference};
use crate::vm::{Collection, VMBinding};
use enum_map::EnumMap;
use std::sync::atomic::Ordering;

pub type SpaceMapping<VM> = Vec<(AllocatorSelector, &'static dyn Space<VM>)>;

/// Mutator prepare for plans without per-mutator GC state.
pub(crate) fn common_prepare_func<VM: VMBinding>(mutator: &mut Mutator<VM>, _tls: VMWorkerThread) {
    mutator.flush();
}

/// A place-holder implementation for `MutatorConfig::release_func` that does nothing.
pub(crate) fn no_op_release_func<VM: VMBinding>(_mutator: &mut Mutator<VM>, _tls: VMWorkerThread) {}

/// A mutator config is used to customize a mutator for each plan. Each plan should
/// provide a mutator config.
#[repr(C)]
pub struct MutatorConfig<VM: VMBinding> {
    /// Mapping between allocation semantics and allocator selector
    pub allocator_mapping: &'static EnumMap<AllocationSemantics, AllocatorSelector>,
    /// Mapping between allocator selector and spaces. Each pair represents a mapping.
    /// Put this behind a box, so it is a pointer-sized field.
    #[allow(clippy::box_collection)]
    pub space_mapping: Box<SpaceMapping<VM>>,
    /// Where pretenured default allocations go, if the plan has a nursery.
    pub pretenure: Option<AllocatorSelector>,
    /// Plan-specific code for mutator prepare. The VMWorkerThread is the worker thread that executes this prepare function.
    pub prepare_func: &'static (dyn Fn(&mut Mutator<VM>, VMWorkerThread) + Send + Sync),
    /// Plan-specific code for mutator release. The VMWorkerThread is the worker thread that executes this release function.
    pub release_func: &'static (dyn Fn(&mut Mutator<VM>, VMWorkerThread) + Send + Sync),
}

impl<VM: VMBinding> std::fmt::Debug for MutatorConfig<VM> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MutatorConfig:\n")?;
        f.write_str("Semantics mapping:\n")?;
        for (semantic, selector) in self.allocator_mapping.iter() {
            let space_name: &str = match self.space_mapping.iter().find(|(selector_to_find, _)| selector_to_find == selector) {
                Some((_, space)) => space.get_name(),
                None => "!!!missing space here!!!",
            };
            f.write_fmt(format_args!("- {:?} = {:?} ({:?})\n", semantic, selector, space_name))?;
        }
        f.write_str("Space mapping:\n")?;
        for (selector, space) in self.space_mapping.iter() {
            f.write_fmt(format_args!("- {:?} = {:?}\n", selector, space.get_name()))?;
        }
        Ok(())
    }
}

/// A mutator is a per-thread data structure that manages allocations and barriers.
/// Each application thread binds one through [`crate::memory_manager::bind_mutator`].
// Mutator is fixed sized:
// - Allocators are fixed-length arrays of allocators.
// - MutatorConfig only has pointers/refs (including fat pointers).
#[repr(C)]
pub struct Mutator<VM: VMBinding> {
    pub(crate) allocators: Allocators<VM>,
    /// Holds some thread-local states for the barrier.
    pub barrier: Box<dyn Barrier<VM>>,
    /// The mutator thread that is bound with this Mutator struct.
    pub mutator_tls: VMMutatorThread,
    pub(crate) plan: &'static dyn Plan<VM = VM>,
    pub(crate) mmtk: &'static MMTK<VM>,
    pub(crate) config: MutatorConfig<VM>,
}

impl<VM: VMBinding> Mutator<VM> {
    pub(crate) fn new(
        tls: VMMutatorThread,
        mmtk: &'static MMTK<VM>,
        barrier: Box<dyn Barrier<VM>>,
        config: MutatorConfig<VM>,
    ) -> Self {
        Mutator {
            allocators: Allocators::<VM>::new(tls.0, &config.space_mapping),
            barrier,
            mutator_tls: tls,
            plan: mmtk.get_plan(),
            mmtk,
            config,
        }
    }

    pub fn get_tls(&self) -> VMMutatorThread {
        self.mutator_tls
    }

    /// Which allocator serves an allocation.
    pub(crate) fn select_allocator(&self, size: usize, semantics: AllocationSemantics, hint: AllocationHint) -> AllocatorSelector {
        if semantics == AllocationSemantics::Default {
            if size > self.plan.constraints().max_non_los_default_alloc_bytes {
                return self.config.allocator_mapping[AllocationSemantics::Los];
            }
            if let (AllocationHint::Pretenure, Some(pretenure)) = (hint, self.config.pretenure) {
                return pretenure;
            }
        }
        self.config.allocator_mapping[semantics]
    }

    /// Allocate memory for an object. Returns zero if the heap is out of
    /// memory, after the runtime was told through [`Collection::out_of_memory`].
    pub fn alloc(&mut self, size: usize, align: usize, offset: usize, semantics: AllocationSemantics, hint: AllocationHint) -> Address {
        let selector = self.select_allocator(size, semantics, hint);
        let result = self.allocators.get_allocator_mut(selector).alloc(size, align, offset);
        if !result.is_zero() {
            return result;
        }
        self.alloc_slow(selector, size, align, offset)
    }

    #[cold]
    fn alloc_slow(&mut self, selector: AllocatorSelector, size: usize, align: usize, offset: usize) -> Address {
        let plan = self.plan;
        let state = &self.mmtk.state;
        log::trace!("Allocation slow path: {} bytes with {:?}", size, selector);

        if conversions::bytes_to_pages_up(size) > plan.get_total_pages() {
            log::warn!("Allocation of {} bytes is larger than the heap", size);
            return self.out_of_memory();
        }
        if !state.is_initialized() {
            log::warn!("Allocation of {} bytes failed before collection was initialized", size);
            return self.out_of_memory();
        }

        let mut attempts = 0;
        loop {
            let heap_pages_before = plan.get_total_pages();
            let epoch = plan.base().gc_requester.request(TriggerReason::Resource);
            self.block_for_gc(epoch);
            attempts += 1;

            if self.check_for_exhaustion(TriggerReason::Resource, heap_pages_before) {
                return self.out_of_memory();
            }

            let result = self.allocators.get_allocator_mut(selector).alloc(size, align, offset);
            if !result.is_zero() {
                state.allocation_success.store(true, Ordering::Relaxed);
                state.pending_request_pages.store(0, Ordering::Relaxed);
                return result;
            }

            if attempts >= MAX_COLLECTION_ATTEMPTS {
                log::warn!("Allocation of {} bytes still fails after {} GCs", size, attempts);
                return self.out_of_memory();
            }
        }
    }

    /// Was the last GC unable to free enough memory? A GC that is not
    /// exhaustive, or one after which the heap may grow, says nothing about
    /// the live size. Before giving up, collect once more with soft
    /// references cleared.
    fn check_for_exhaustion(&mut self, reason: TriggerReason, heap_pages_before: usize) -> bool {
        let plan = self.plan;
        let state = &self.mmtk.state;
        if !state.last_collection_was_exhaustive() || plan.get_total_pages() != heap_pages_before {
            return false;
        }

        let total = plan.get_total_pages();
        let reserved = plan.get_reserved_pages() + state.pending_request_pages.load(Ordering::Relaxed);
        let usage = reserved as f64 / total as f64;
        log::debug!("Heap usage after GC: {} / {} pages ({:.3})", reserved, total, usage);
        if usage <= OUT_OF_MEMORY_THRESHOLD {
            return false;
        }
        if reason == TriggerReason::Internal {
            return true;
        }

        log::info!("Heap usage {:.3} after a full GC. Clearing soft references and collecting again.", usage);
        state.set_clear_soft_refs(true);
        let epoch = plan.base().gc_requester.request(TriggerReason::Internal);
        self.block_for_gc(epoch);
        state.set_clear_soft_refs(false);
        self.check_for_exhaustion(TriggerReason::Internal, heap_pages_before)
    }

    fn out_of_memory(&mut self) -> Address {
        log::warn!("Out of memory: {} of {} pages reserved", self.plan.get_reserved_pages(), self.plan.get_total_pages());
        self.mmtk.state.pending_request_pages.store(0, Ordering::Relaxed);
        VM::VMCollection::out_of_memory(self.mutator_tls.0, AllocationError::HeapOutOfMemory);
        Address::ZERO
    }

    /// Park until the GC of `epoch` has completed.
    pub(crate) fn block_for_gc(&mut self, epoch: usize) {
        log::trace!("{:?} blocks for GC epoch {}", self.mutator_tls, epoch);
        self.mmtk.monitor.block_for_gc(epoch);
    }

    /// Set up the GC state of a new object.
    pub fn post_alloc(&mut self, object: ObjectReference, bytes: usize, semantics: AllocationSemantics) {
        let plan = self.plan;
        // A space the mutator was rebound to may not be in the config any more.
        let space = plan
            .space_of(object)
            .unwrap_or_else(|| panic!("{} is not in any space", object));
        space.initialize_object_metadata(object, true);
        plan.post_alloc(self, object, bytes, semantics);
    }

    pub(crate) fn prepare(&mut self, tls: VMWorkerThread) {
        (*self.config.prepare_func)(self, tls)
    }

    pub(crate) fn release(&mut self, tls: VMWorkerThread) {
        (*self.config.release_func)(self, tls)
    }

    /// Hand buffered allocator and barrier state to the collector.
    pub fn flush(&mut self) {
        self.allocators.flush_all();
        self.barrier.flush();
    }

    /// Called before the mutator is destroyed.
    pub fn on_destroy(&mut self) {
        self.flush();
    }

    /// Get the allocator for the selector.
    pub fn allocator(&self, selector: AllocatorSelector) -> &dyn Allocator<VM> {
        self.allocators.get_allocator(selector)
    }

    /// Get the mutable allocator for the selector.
    pub fn allocator_mut(&mut self, selector: AllocatorSelector) -> &mut dyn Allocator<VM> {
        self.allocators.get_allocator_mut(selector)
    }

    /// Get the allocator of a concrete type for the selector.
    pub fn allocator_impl_mut<T: Allocator<VM>>(&mut self, selector: AllocatorSelector) -> &mut T {
        self.allocators.get_typed_allocator_mut::<T>(selector)
    }

    /// The allocator that serves `semantics`.
    pub fn get_allocator_selector(&self, semantics: AllocationSemantics) -> AllocatorSelector {
        self.config.allocator_mapping[semantics]
    }
}

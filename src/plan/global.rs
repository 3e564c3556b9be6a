//! The global part of a plan implementation.

use super::PlanConstraints;
use crate::global_state::GlobalState;
use crate::mmtk::MMTK;
use crate::plan::gc_requester::GCRequester;
use crate::plan::mutator_context::Mutator;
use crate::plan::tracing::ObjectQueue;
use crate::policy::immortalspace::ImmortalSpace;
use crate::policy::largeobjectspace::LargeObjectSpace;
use crate::policy::space::{PlanCreateSpaceArgs, Space};
use crate::scheduler::{CollectorContext, SafepointMonitor};
use crate::util::copy::CopyConfig;
use crate::util::deque::{MetaDataPool, SharedDeque};
use crate::util::heap::gc_trigger::GCTrigger;
use crate::util::heap::HeapMeta;
use crate::util::log;
use crate::util::memory::HeapMemory;
use crate::util::opaque_pointer::*;
use crate::util::options::{Options, PlanSelector};
use crate::util::statistics::Stats;
use crate::util::ObjectReference;
use crate::vm::VMBinding;
use downcast_rs::Downcast;
use crate::util::alloc::AllocatorSelector;
use enum_map::{Enum, EnumMap};
use std::sync::Arc;

/// The usage ratio above which a GC that freed nothing counts as out of memory.
pub const OUT_OF_MEMORY_THRESHOLD: f64 = 0.98;

/// The most GCs one allocation may trigger before it gives up.
pub const MAX_COLLECTION_ATTEMPTS: usize = 10;

pub fn create_mutator<VM: VMBinding>(tls: VMMutatorThread, mmtk: &'static MMTK<VM>) -> Box<Mutator<VM>> {
    Box::new(match mmtk.options.plan {
        PlanSelector::GenCopy => crate::plan::gencopy::mutator::create_gencopy_mutator(tls, mmtk),
        PlanSelector::MarkSweep => crate::plan::marksweep::mutator::create_ms_mutator(tls, mmtk),
        PlanSelector::GenRC => crate::plan::genrc::mutator::create_genrc_mutator(tls, mmtk),
        PlanSelector::RefCount => crate::plan::refcount::mutator::create_rc_mutator(tls, mmtk),
    })
}

/// The allocation semantics to allocator mapping of a plan.
pub fn allocator_mapping(plan: PlanSelector) -> &'static EnumMap<AllocationSemantics, AllocatorSelector> {
    match plan {
        PlanSelector::GenCopy => &crate::plan::gencopy::mutator::ALLOCATOR_MAPPING,
        PlanSelector::MarkSweep => &crate::plan::marksweep::mutator::ALLOCATOR_MAPPING,
        PlanSelector::GenRC => &crate::plan::genrc::mutator::ALLOCATOR_MAPPING,
        PlanSelector::RefCount => &crate::plan::refcount::mutator::ALLOCATOR_MAPPING,
    }
}

pub fn create_plan<VM: VMBinding>(plan: PlanSelector, args: CreateGeneralPlanArgs<VM>) -> Box<dyn Plan<VM = VM>> {
    let plan = match plan {
        PlanSelector::GenCopy => Box::new(crate::plan::gencopy::GenCopy::new(args)) as Box<dyn Plan<VM = VM>>,
        PlanSelector::MarkSweep => Box::new(crate::plan::marksweep::MarkSweep::new(args)),
        PlanSelector::GenRC => Box::new(crate::plan::genrc::GenRC::new(args)),
        PlanSelector::RefCount => Box::new(crate::plan::refcount::RefCount::new(args)),
    };

    log::info!("Created plan {:?}", plan.base().options.plan);
    for space in plan.get_spaces() {
        log::debug!("{}", space.print_vm_map());
    }
    plan
}

/// A plan describes the global core functionality for all memory management schemes.
/// All global GC plans should implement this trait.
///
/// The global instance defines and manages static resources (such as memory and virtual memory resources).
///
/// Constructor:
///
/// For the constructor of a new plan, there are a few things the constructor _must_ do
/// (please check existing plans and see what they do in the constructor):
/// 1. Create a `HeapMeta`, and use this `HeapMeta` to initialize all the spaces.
/// 2. Create the arena the spaces share, sized by the `HeapMeta`.
/// 3. Hand out `&'static` references to its spaces only after the plan has
///    been leaked together with the rest of the `MMTK` instance.
pub trait Plan: 'static + Sync + Downcast {
    type VM: VMBinding;

    fn constraints(&self) -> &'static PlanConstraints;

    /// Create a copy config for this plan. A copying GC plan MUST override this method,
    /// and provide a valid config.
    fn create_copy_config(&'static self) -> CopyConfig<Self::VM> {
        // Use the empty default copy config for non copying GC.
        CopyConfig::default()
    }

    /// Get a immutable reference to the base plan. `BasePlan` is included by all the plans.
    fn base(&self) -> &BasePlan<Self::VM>;

    /// Get the common plan. `CommonPlan` is included by every plan.
    fn common(&self) -> &CommonPlan<Self::VM>;

    /// Return a reference to the reference counting part of the plan, if it counts references.
    fn rc_base(&self) -> Option<&crate::plan::rcbase::RcBase<Self::VM>> {
        None
    }

    /// Get all the spaces in the plan.
    fn get_spaces(&self) -> Vec<&dyn Space<Self::VM>>;

    /// The space that contains `object`.
    fn space_of(&self, object: ObjectReference) -> Option<&dyn Space<Self::VM>> {
        self.get_spaces().into_iter().find(|s| s.in_space(object))
    }

    /// Is current GC only collecting objects allocated since last GC?
    fn is_current_gc_nursery(&self) -> bool {
        false
    }

    /// Prepare the plan before a GC. This is invoked on the elected collector
    /// once every mutator has stopped.
    fn prepare(&self, tls: VMWorkerThread);

    /// Prepare a collector thread before a GC.
    fn prepare_worker(&self, _ctx: &mut CollectorContext<Self::VM>) {}

    /// Trace whatever the plan remembers besides the roots, such as the
    /// objects recorded by the write barrier. Runs on the primary collector.
    fn trace_remembered(&self, _ctx: &mut CollectorContext<Self::VM>) {}

    /// Thread-local release. Runs on every collector; may rendezvous.
    fn release_worker(&self, _ctx: &mut CollectorContext<Self::VM>) {}

    /// Release the plan after transitive closure. This is invoked on the
    /// elected collector before mutators resume.
    fn release(&self, tls: VMWorkerThread);

    /// Inform the plan about the end of a GC.
    fn end_of_gc(&self, _tls: VMWorkerThread) {}

    /// Trace `object`, reached from a root if `root` is set. Returns the
    /// location of the object after this GC.
    fn trace_object(&self, ctx: &mut CollectorContext<Self::VM>, object: ObjectReference, root: bool) -> ObjectReference;

    /// Set up the GC state of a newly allocated object.
    fn post_alloc(&self, _mutator: &mut Mutator<Self::VM>, _object: ObjectReference, _bytes: usize, _semantics: AllocationSemantics) {}

    /// Set up the GC state of an object the GC just copied.
    fn post_copy(&self, _object: ObjectReference, _bytes: usize) {}

    /// Do live soft references keep their referents alive?
    fn retains_soft_refs(&self) -> bool {
        true
    }

    /// Ask the plan if they would trigger a GC. This method is called each time
    /// a space acquires pages. This method returns true to trigger a collection.
    ///
    /// # Arguments
    /// * `space_full`: the allocation to a specific space failed, must recover pages within 'space'.
    /// * `space`: an option to indicate if there is a space that has failed in an allocation.
    fn collection_required(&self, space_full: bool, space: Option<&dyn Space<Self::VM>>) -> bool;

    /// Get the number of pages that are reserved, including pages used by the spaces and pages that
    /// will be used (e.g. for copying).
    fn get_reserved_pages(&self) -> usize {
        self.get_used_pages() + self.get_collection_reserved_pages()
    }

    /// Get the total number of pages for the heap.
    fn get_total_pages(&self) -> usize {
        self.base().gc_trigger.get_heap_size_in_pages()
    }

    /// Get the number of pages that are still available for use. The available pages
    /// should always be positive or 0.
    fn get_available_pages(&self) -> usize {
        self.get_total_pages().saturating_sub(self.get_reserved_pages())
    }

    /// Get the number of pages that are reserved for collection. By default, we return 0.
    /// For copying plans, they need to override this and calculate required pages to complete
    /// a copying GC.
    fn get_collection_reserved_pages(&self) -> usize {
        0
    }

    /// Get the number of pages that are used.
    fn get_used_pages(&self) -> usize;

    /// Get the number of pages that are NOT used. This is clearly different from available pages.
    /// Free pages are unused, but some of them may have been reserved for some reason.
    fn get_free_pages(&self) -> usize {
        self.get_total_pages().saturating_sub(self.get_used_pages())
    }

    /// Did the last GC collect every dead object it could?
    fn last_collection_was_exhaustive(&self) -> bool {
        true
    }

    /// Is the object live? Only meaningful during a GC, or for objects the
    /// GC has not freed.
    fn is_live(&self, object: ObjectReference) -> bool {
        self.space_of(object).is_some_and(|s| s.is_live(object))
    }

    /// The location of the object after the current GC.
    fn get_forwarded(&self, object: ObjectReference) -> ObjectReference {
        self.space_of(object)
            .and_then(|s| s.get_forwarded_object(object))
            .unwrap_or(object)
    }
}

impl_downcast!(Plan assoc VM);

/// Allocation semantics the runtime asks for. The plan maps each to an allocator.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Enum, PartialEq, Eq)]
pub enum AllocationSemantics {
    /// The default semantic. This means there is no specific requirement for the allocation.
    /// The actual semantic of the default will depend on the GC plan in use.
    Default = 0,
    /// Immortal objects will not be reclaimed. Tracing plans still trace immortal objects, but will not
    /// reclaim the objects even if they are dead.
    Immortal = 1,
    /// Large objects. It is usually desirable to allocate large objects specially. Large objects
    /// are allocated with page granularity and will not be moved.
    Los = 2,
}

/// A hint from the allocation site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AllocationHint {
    #[default]
    None,
    /// The object is expected to live long. Generational plans allocate it
    /// in the mature space.
    Pretenure,
}

/**
BasePlan should contain all plan-related state and functions that are _fundamental_ to _all_ plans.  These include VM-specific (but not plan-specific) features such as a code space or vm space, which are fundamental to all plans for a given VM.  Features that are common to _many_ (but not intrinsically _all_) plans should instead be included in CommonPlan.
*/
pub struct BasePlan<VM: VMBinding> {
    pub options: Arc<Options>,
    pub state: Arc<GlobalState>,
    pub gc_trigger: Arc<GCTrigger<VM>>,
    pub gc_requester: Arc<GCRequester>,
    pub monitor: Arc<SafepointMonitor>,
    pub heap: Arc<HeapMemory>,
    pub stats: Arc<Stats>,
    /// The pages every deque draws its chunks from.
    pub meta_pool: Arc<MetaDataPool>,
    /// Objects the current GC still has to scan.
    pub trace: Arc<SharedDeque>,
}

/// Args needed for creating any plan. This includes a set of contexts from `MMTK` or global. This
/// is passed to each plan's constructor.
pub struct CreateGeneralPlanArgs<VM: VMBinding> {
    pub options: Arc<Options>,
    pub state: Arc<GlobalState>,
    pub gc_trigger: Arc<GCTrigger<VM>>,
    pub monitor: Arc<SafepointMonitor>,
    pub stats: Arc<Stats>,
}

/// Args needed for creating a specific plan. This includes plan-specific args, such as the heap
/// layout and the arena. This is created in each plan's constructor, and will be passed
/// to `CommonPlan` or `BasePlan`.
pub struct CreateSpecificPlanArgs<VM: VMBinding> {
    pub global_args: CreateGeneralPlanArgs<VM>,
    pub heap_meta: HeapMeta,
    pub heap: Arc<HeapMemory>,
}

impl<VM: VMBinding> CreateSpecificPlanArgs<VM> {
    /// Lay out the plan's own spaces followed by the common ones, and create
    /// the arena. Every space may grow up to the maximum heap size.
    pub fn new(global_args: CreateGeneralPlanArgs<VM>, spaces: &[&'static str]) -> Self {
        let extent = global_args.options.gc_trigger.max_heap_size();
        let mut heap_meta = HeapMeta::new();
        for &name in spaces.iter().chain(CommonPlan::<VM>::SPACES.iter()) {
            heap_meta.specify_space(name, extent);
        }
        let heap = Arc::new(HeapMemory::new(heap_meta.heap_start(), heap_meta.total_bytes()));
        CreateSpecificPlanArgs {
            global_args,
            heap_meta,
            heap,
        }
    }

    /// Get a PlanCreateSpaceArgs that can be used to create a space
    pub fn get_space_args(&self, name: &'static str) -> PlanCreateSpaceArgs<VM> {
        PlanCreateSpaceArgs {
            meta: self
                .heap_meta
                .get_space_meta(name)
                .unwrap_or_else(|| panic!("Space {} is not specified", name)),
            heap: &self.heap,
            gc_trigger: &self.global_args.gc_trigger,
            state: &self.global_args.state,
            options: &self.global_args.options,
        }
    }
}

impl<VM: VMBinding> BasePlan<VM> {
    pub fn new(args: &CreateSpecificPlanArgs<VM>) -> BasePlan<VM> {
        let global = &args.global_args;
        let meta_pool = Arc::new(MetaDataPool::new());
        BasePlan {
            options: global.options.clone(),
            state: global.state.clone(),
            gc_trigger: global.gc_trigger.clone(),
            gc_requester: Arc::new(GCRequester::new(global.monitor.clone())),
            monitor: global.monitor.clone(),
            heap: args.heap.clone(),
            stats: global.stats.clone(),
            trace: Arc::new(SharedDeque::new("trace", meta_pool.clone())),
            meta_pool,
        }
    }

    /// The conditions every plan collects on: the heap is full, a space is
    /// full, or the deques hold more pages than allowed.
    pub fn collection_required<P: Plan>(&self, plan: &P, space_full: bool) -> bool {
        let heap_full = plan.get_reserved_pages() > plan.get_total_pages();
        let meta_data_full = self.meta_pool.reserved_pages() > self.options.meta_data_limit;
        log::trace!(
            "heap_full = {} ({} / {}), meta_data_full = {}, space_full = {}",
            heap_full,
            plan.get_reserved_pages(),
            plan.get_total_pages(),
            meta_data_full,
            space_full
        );
        space_full || heap_full || meta_data_full
    }
}

/**
CommonPlan is for representing state and features used by _many_ plans, but that are not fundamental to _all_ plans.  Examples include the Large Object Space and an Immortal space.  Features that are fundamental to _all_ plans must be included in BasePlan.
*/
pub struct CommonPlan<VM: VMBinding> {
    pub immortal: ImmortalSpace<VM>,
    pub los: LargeObjectSpace<VM>,
    pub base: BasePlan<VM>,
}

impl<VM: VMBinding> CommonPlan<VM> {
    pub const SPACES: [&'static str; 2] = ["immortal", "los"];

    pub fn new(args: &CreateSpecificPlanArgs<VM>) -> CommonPlan<VM> {
        CommonPlan {
            immortal: ImmortalSpace::new(args.get_space_args("immortal")),
            los: LargeObjectSpace::new(args.get_space_args("los")),
            base: BasePlan::new(args),
        }
    }

    pub fn get_spaces(&self) -> Vec<&dyn Space<VM>> {
        vec![&self.immortal, &self.los]
    }

    pub fn get_used_pages(&self) -> usize {
        self.immortal.reserved_pages() + self.los.reserved_pages()
    }

    pub fn trace_object<Q: ObjectQueue>(&self, queue: &mut Q, object: ObjectReference) -> ObjectReference {
        if self.immortal.in_space(object) {
            return self.immortal.trace_object(queue, object);
        }
        if self.los.in_space(object) {
            return self.los.trace_object(queue, object);
        }
        panic!("{} is not in any space", object)
    }

    pub fn prepare(&self, _tls: VMWorkerThread, full_heap: bool) {
        if full_heap {
            self.immortal.prepare();
        }
        self.los.prepare(full_heap);
    }

    pub fn release(&self, _tls: VMWorkerThread, full_heap: bool) {
        self.immortal.release();
        self.los.release(full_heap);
    }

    pub fn get_immortal(&self) -> &ImmortalSpace<VM> {
        &self.immortal
    }

    pub fn get_los(&self) -> &LargeObjectSpace<VM> {
        &self.los
    }
}

use crate::plan::barriers::BarrierSelector;
use crate::plan::generational::NURSERY;
use crate::plan::global::{BasePlan, CommonPlan, CreateGeneralPlanArgs, CreateSpecificPlanArgs};
use crate::plan::mutator_context::Mutator;
use crate::plan::rcbase::global::RC_SPACE;
use crate::plan::rcbase::RcBase;
use crate::plan::{AllocationSemantics, Plan, PlanConstraints};
use crate::policy::copyspace::CopySpace;
use crate::policy::refcount::CycleHost;
use crate::policy::space::Space;
use crate::scheduler::CollectorContext;
use crate::util::alloc::AllocatorSelector;
use crate::util::copy::CopyConfig;
use crate::util::header::{rc, HeaderLayout};
use crate::util::opaque_pointer::VMWorkerThread;
use crate::util::ObjectReference;
use crate::vm::{ObjectModel, VMBinding};

pub struct GenRC<VM: VMBinding> {
    pub nursery: CopySpace<VM>,
    pub rc: RcBase<VM>,
}

/// The plan constraints for the ulterior reference counting plan.
pub const GENRC_CONSTRAINTS: PlanConstraints = PlanConstraints {
    moves_objects: true,
    needs_log_bit: true,
    header_layout: HeaderLayout::RefCount,
    barrier: BarrierSelector::RCBarrier,
    ..PlanConstraints::default()
};

impl<VM: VMBinding> Plan for GenRC<VM> {
    type VM = VM;

    fn constraints(&self) -> &'static PlanConstraints {
        &GENRC_CONSTRAINTS
    }

    fn create_copy_config(&'static self) -> CopyConfig<Self::VM> {
        CopyConfig {
            copy_mapping: Some((AllocatorSelector::FreeList(0), &self.rc.rc_space)),
        }
    }

    fn base(&self) -> &BasePlan<VM> {
        &self.rc.common.base
    }

    fn common(&self) -> &CommonPlan<VM> {
        &self.rc.common
    }

    fn rc_base(&self) -> Option<&RcBase<VM>> {
        Some(&self.rc)
    }

    fn get_spaces(&self) -> Vec<&dyn Space<Self::VM>> {
        let mut ret = self.rc.get_spaces();
        ret.push(&self.nursery);
        ret
    }

    fn collection_required(&self, space_full: bool, _space: Option<&dyn Space<Self::VM>>) -> bool {
        self.nursery.reserved_pages() >= self.nursery_budget() || self.base().collection_required(self, space_full)
    }

    fn prepare(&self, tls: VMWorkerThread) {
        self.rc.prepare(tls);
        self.nursery.prepare(true);
    }

    fn trace_remembered(&self, ctx: &mut CollectorContext<VM>) {
        self.rc.trace_remembered(ctx);
    }

    fn release_worker(&self, ctx: &mut CollectorContext<VM>) {
        self.rc.release_worker(ctx);
    }

    fn release(&self, tls: VMWorkerThread) {
        self.nursery.release();
        self.rc.release(tls);
    }

    /// Promote nursery objects, and count every reference to a mature one.
    fn trace_object(&self, ctx: &mut CollectorContext<VM>, object: ObjectReference, root: bool) -> ObjectReference {
        if self.nursery.in_space(object) {
            let promoted = self.nursery.trace_object(&mut ctx.trace, object, &mut ctx.copy);
            return self.rc.trace_rc(ctx.rc_local(), promoted, root);
        }
        if self.rc.is_rc_object(object) {
            return self.rc.trace_rc(ctx.rc_local(), object, root);
        }
        // Immortal objects are neither counted nor traced.
        object
    }

    fn post_alloc(&self, mutator: &mut Mutator<VM>, object: ObjectReference, _bytes: usize, _semantics: AllocationSemantics) {
        if self.nursery.in_space(object) {
            let heap = &self.base().heap;
            rc::initialize_header(heap, object, false, VM::VMObjectModel::is_acyclic(heap, object));
        } else {
            self.rc.post_alloc(mutator, object);
        }
    }

    fn post_copy(&self, object: ObjectReference, _bytes: usize) {
        self.rc.post_copy(object);
    }

    fn retains_soft_refs(&self) -> bool {
        false
    }

    fn get_collection_reserved_pages(&self) -> usize {
        // Every nursery survivor needs room in the mature space.
        self.nursery.reserved_pages()
    }

    fn get_used_pages(&self) -> usize {
        self.nursery.reserved_pages() + self.rc.get_used_pages()
    }

    fn last_collection_was_exhaustive(&self) -> bool {
        self.rc.last_collection_was_exhaustive()
    }
}

impl<VM: VMBinding> GenRC<VM> {
    pub fn new(args: CreateGeneralPlanArgs<VM>) -> Self {
        let plan_args = CreateSpecificPlanArgs::new(args, &[NURSERY, RC_SPACE]);
        GenRC {
            nursery: CopySpace::new(plan_args.get_space_args(NURSERY), false),
            rc: RcBase::new(&plan_args),
        }
    }

    /// The pages the nursery may grow to before a GC is triggered.
    pub fn nursery_budget(&self) -> usize {
        let base = self.base();
        let total = base.gc_trigger.get_heap_size_in_pages();
        ((total as f64 * base.options.nursery_fraction) as usize).max(1)
    }
}

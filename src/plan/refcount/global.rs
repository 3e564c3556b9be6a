use crate::plan::barriers::BarrierSelector;
use crate::plan::global::{BasePlan, CommonPlan, CreateGeneralPlanArgs, CreateSpecificPlanArgs};
use crate::plan::mutator_context::Mutator;
use crate::plan::rcbase::global::RC_SPACE;
use crate::plan::rcbase::RcBase;
use crate::plan::{AllocationSemantics, Plan, PlanConstraints};
use crate::policy::refcount::CycleHost;
use crate::policy::space::Space;
use crate::scheduler::CollectorContext;
use crate::util::header::HeaderLayout;
use crate::util::opaque_pointer::VMWorkerThread;
use crate::util::ObjectReference;
use crate::vm::VMBinding;

pub struct RefCount<VM: VMBinding> {
    pub rc: RcBase<VM>,
}

/// The plan constraints for the reference counting plan.
pub const RC_CONSTRAINTS: PlanConstraints = PlanConstraints {
    needs_log_bit: true,
    header_layout: HeaderLayout::RefCount,
    barrier: BarrierSelector::RCBarrier,
    ..PlanConstraints::default()
};

impl<VM: VMBinding> Plan for RefCount<VM> {
    type VM = VM;

    fn constraints(&self) -> &'static PlanConstraints {
        &RC_CONSTRAINTS
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
        self.rc.get_spaces()
    }

    fn collection_required(&self, space_full: bool, _space: Option<&dyn Space<Self::VM>>) -> bool {
        self.base().collection_required(self, space_full)
    }

    fn prepare(&self, tls: VMWorkerThread) {
        self.rc.prepare(tls);
    }

    fn trace_remembered(&self, ctx: &mut CollectorContext<VM>) {
        self.rc.trace_remembered(ctx);
    }

    fn release_worker(&self, ctx: &mut CollectorContext<VM>) {
        self.rc.release_worker(ctx);
    }

    fn release(&self, tls: VMWorkerThread) {
        self.rc.release(tls);
    }

    fn trace_object(&self, ctx: &mut CollectorContext<VM>, object: ObjectReference, root: bool) -> ObjectReference {
        if self.rc.is_rc_object(object) {
            return self.rc.trace_rc(ctx.rc_local(), object, root);
        }
        object
    }

    fn post_alloc(&self, mutator: &mut Mutator<VM>, object: ObjectReference, _bytes: usize, _semantics: AllocationSemantics) {
        self.rc.post_alloc(mutator, object);
    }

    fn retains_soft_refs(&self) -> bool {
        false
    }

    fn get_used_pages(&self) -> usize {
        self.rc.get_used_pages()
    }

    fn last_collection_was_exhaustive(&self) -> bool {
        self.rc.last_collection_was_exhaustive()
    }
}

impl<VM: VMBinding> RefCount<VM> {
    pub fn new(args: CreateGeneralPlanArgs<VM>) -> Self {
        let plan_args = CreateSpecificPlanArgs::new(args, &[RC_SPACE]);
        RefCount {
            rc: RcBase::new(&plan_args),
        }
    }
}

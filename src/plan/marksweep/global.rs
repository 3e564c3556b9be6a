use crate::plan::global::{BasePlan, CommonPlan, CreateGeneralPlanArgs, CreateSpecificPlanArgs};
use crate::plan::{Plan, PlanConstraints};
use crate::policy::marksweepspace::MarkSweepSpace;
use crate::policy::space::Space;
use crate::scheduler::CollectorContext;
use crate::util::opaque_pointer::VMWorkerThread;
use crate::util::ObjectReference;
use crate::vm::VMBinding;

pub struct MarkSweep<VM: VMBinding> {
    common: CommonPlan<VM>,
    ms: MarkSweepSpace<VM>,
}

pub const MS_CONSTRAINTS: PlanConstraints = PlanConstraints::default();

impl<VM: VMBinding> Plan for MarkSweep<VM> {
    type VM = VM;

    fn constraints(&self) -> &'static PlanConstraints {
        &MS_CONSTRAINTS
    }

    fn base(&self) -> &BasePlan<VM> {
        &self.common.base
    }

    fn common(&self) -> &CommonPlan<VM> {
        &self.common
    }

    fn get_spaces(&self) -> Vec<&dyn Space<Self::VM>> {
        let mut ret = self.common.get_spaces();
        ret.push(&self.ms);
        ret
    }

    fn collection_required(&self, space_full: bool, _space: Option<&dyn Space<Self::VM>>) -> bool {
        self.base().collection_required(self, space_full)
    }

    fn prepare(&self, tls: VMWorkerThread) {
        self.common.prepare(tls, true);
        self.ms.prepare();
    }

    fn release(&self, tls: VMWorkerThread) {
        self.ms.release();
        self.common.release(tls, true);
    }

    fn trace_object(&self, ctx: &mut CollectorContext<VM>, object: ObjectReference, _root: bool) -> ObjectReference {
        if self.ms.in_space(object) {
            return self.ms.trace_object(&mut ctx.trace, object);
        }
        self.common.trace_object(&mut ctx.trace, object)
    }

    fn get_used_pages(&self) -> usize {
        self.common.get_used_pages() + self.ms.reserved_pages()
    }
}

impl<VM: VMBinding> MarkSweep<VM> {
    pub fn new(args: CreateGeneralPlanArgs<VM>) -> Self {
        let plan_args = CreateSpecificPlanArgs::new(args, &["ms"]);
        MarkSweep {
            ms: MarkSweepSpace::new(plan_args.get_space_args("ms")),
            common: CommonPlan::new(&plan_args),
        }
    }

    pub fn ms_space(&self) -> &MarkSweepSpace<VM> {
        &self.ms
    }
}

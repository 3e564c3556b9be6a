use crate::plan::barriers::BarrierSelector;
use crate::plan::generational::global::Gen;
use crate::plan::generational::NURSERY;
use crate::plan::global::{BasePlan, CommonPlan, CreateGeneralPlanArgs, CreateSpecificPlanArgs};
use crate::plan::mutator_context::Mutator;
use crate::plan::{AllocationSemantics, Plan, PlanConstraints};
use crate::policy::copyspace::CopySpace;
use crate::policy::space::Space;
use crate::scheduler::CollectorContext;
use crate::util::alloc::AllocatorSelector;
use crate::util::copy::CopyConfig;
use crate::util::deque::LocalDeque;
use crate::util::header::status;
use crate::util::header::HeaderLayout;
use crate::util::opaque_pointer::VMWorkerThread;
use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, VMBinding};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct GenCopy<VM: VMBinding> {
    pub gen: Gen<VM>,
    pub hi: AtomicBool,
    pub copyspace0: CopySpace<VM>,
    pub copyspace1: CopySpace<VM>,
}

/// The plan constraints for the generational copying plan.
pub const GENCOPY_CONSTRAINTS: PlanConstraints = PlanConstraints {
    moves_objects: true,
    needs_log_bit: true,
    header_layout: HeaderLayout::Mark,
    barrier: BarrierSelector::ObjectBarrier,
    ..PlanConstraints::default()
};

impl<VM: VMBinding> Plan for GenCopy<VM> {
    type VM = VM;

    fn constraints(&self) -> &'static PlanConstraints {
        &GENCOPY_CONSTRAINTS
    }

    fn create_copy_config(&'static self) -> CopyConfig<Self::VM> {
        CopyConfig {
            // The tospace doesn't matter, we will rebind before a GC anyway.
            copy_mapping: Some((AllocatorSelector::BumpPointer(0), self.tospace())),
        }
    }

    fn base(&self) -> &BasePlan<VM> {
        &self.gen.common.base
    }

    fn common(&self) -> &CommonPlan<VM> {
        &self.gen.common
    }

    fn get_spaces(&self) -> Vec<&dyn Space<Self::VM>> {
        let mut ret = self.gen.get_spaces();
        ret.push(&self.copyspace0);
        ret.push(&self.copyspace1);
        ret
    }

    fn is_current_gc_nursery(&self) -> bool {
        self.gen.is_current_gc_nursery()
    }

    fn collection_required(&self, space_full: bool, space: Option<&dyn Space<Self::VM>>) -> bool {
        self.gen.collection_required(self, space_full, space)
    }

    fn prepare(&self, tls: VMWorkerThread) {
        let full_heap = self
            .gen
            .request_full_heap_collection(self.get_total_pages(), self.get_reserved_pages());
        self.gen.prepare(tls);
        if full_heap {
            self.hi.store(!self.hi.load(Ordering::SeqCst), Ordering::SeqCst); // flip the semi-spaces
        }
        let hi = self.hi.load(Ordering::SeqCst);
        self.copyspace0.prepare(hi);
        self.copyspace1.prepare(!hi);
    }

    fn prepare_worker(&self, ctx: &mut CollectorContext<VM>) {
        // The copy context outlives this borrow, so go through the static plan.
        let plan: &'static dyn Plan<VM = VM> = ctx.plan;
        let gencopy = plan
            .downcast_ref::<GenCopy<VM>>()
            .unwrap_or_else(|| panic!("GenCopy worker bound to another plan"));
        ctx.copy.rebind(gencopy.tospace());
    }

    /// Scan the objects the barrier remembered. They stay mature, so in a
    /// nursery GC their fields are the only way into the nursery besides
    /// roots. In a full heap GC they are just reset.
    fn trace_remembered(&self, ctx: &mut CollectorContext<VM>) {
        let heap = &self.base().heap;
        let nursery_gc = self.is_current_gc_nursery();
        let mut modbuf = LocalDeque::new(self.gen.modbuf.clone());
        let mut remembered = 0;
        while let Some(object) = modbuf.try_pop() {
            remembered += 1;
            // A root may already have moved it in a full heap GC. The copy is
            // unlogged by `post_copy`.
            if !status::make_unlogged_unless_forwarded(heap, object) {
                continue;
            }
            if !nursery_gc {
                continue;
            }
            let mut slots = vec![];
            VM::VMObjectModel::scan_object(heap, object, &mut |slot: Address| slots.push(slot));
            for slot in slots {
                if let Some(child) = heap.load_reference(slot) {
                    let new_child = self.trace_object(ctx, child, false);
                    if new_child != child {
                        heap.store_reference(slot, Some(new_child));
                    }
                }
            }
        }
        crate::util::log::debug!("Processed {} remembered objects", remembered);
    }

    fn release(&self, tls: VMWorkerThread) {
        let full_heap = !self.gen.is_current_gc_nursery();
        self.gen.release(tls);
        if full_heap {
            self.fromspace().release();
        }
    }

    fn end_of_gc(&self, _tls: VMWorkerThread) {
        self.gen.set_next_gc_full_heap(self.get_available_pages());
    }

    fn trace_object(&self, ctx: &mut CollectorContext<VM>, object: ObjectReference, _root: bool) -> ObjectReference {
        if self.is_current_gc_nursery() {
            return self.gen.trace_object_nursery(&mut ctx.trace, object, &mut ctx.copy);
        }
        if self.fromspace().in_space(object) {
            return self.fromspace().trace_object(&mut ctx.trace, object, &mut ctx.copy);
        }
        if self.tospace().in_space(object) {
            return object;
        }
        self.gen.trace_object_full_heap(&mut ctx.trace, object, &mut ctx.copy)
    }

    fn post_alloc(&self, _mutator: &mut Mutator<VM>, object: ObjectReference, _bytes: usize, _semantics: AllocationSemantics) {
        // Anything outside the nursery is mature from the start.
        if !self.gen.nursery.in_space(object) {
            status::make_unlogged(&self.base().heap, object);
        }
    }

    fn post_copy(&self, object: ObjectReference, _bytes: usize) {
        status::make_unlogged(&self.base().heap, object);
    }

    fn get_collection_reserved_pages(&self) -> usize {
        self.gen.nursery.reserved_pages() + self.tospace().reserved_pages()
    }

    fn get_used_pages(&self) -> usize {
        self.gen.get_used_pages() + self.tospace().reserved_pages()
    }

    fn last_collection_was_exhaustive(&self) -> bool {
        !self.gen.is_current_gc_nursery()
    }
}

impl<VM: VMBinding> GenCopy<VM> {
    pub fn new(args: CreateGeneralPlanArgs<VM>) -> Self {
        let plan_args = CreateSpecificPlanArgs::new(args, &[NURSERY, "copyspace0", "copyspace1"]);

        GenCopy {
            copyspace0: CopySpace::new(plan_args.get_space_args("copyspace0"), false),
            copyspace1: CopySpace::new(plan_args.get_space_args("copyspace1"), true),
            gen: Gen::new(&plan_args),
            hi: AtomicBool::new(false),
        }
    }

    pub fn tospace(&self) -> &CopySpace<VM> {
        if self.hi.load(Ordering::SeqCst) {
            &self.copyspace1
        } else {
            &self.copyspace0
        }
    }

    pub fn fromspace(&self) -> &CopySpace<VM> {
        if self.hi.load(Ordering::SeqCst) {
            &self.copyspace0
        } else {
            &self.copyspace1
        }
    }
}

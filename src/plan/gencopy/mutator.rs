use super::GenCopy;
use crate::plan::barriers::ObjectRememberingBarrier;
use crate::plan::mutator_context::{common_prepare_func, Mutator, MutatorConfig};
use crate::plan::{AllocationSemantics, Plan};
use crate::util::alloc::{AllocatorSelector, BumpAllocator};
use crate::util::opaque_pointer::{VMMutatorThread, VMWorkerThread};
use crate::vm::VMBinding;
use crate::MMTK;
use enum_map::{enum_map, EnumMap};

/// Pretenured objects are bump allocated straight into the mature tospace.
const PRETENURE: AllocatorSelector = AllocatorSelector::BumpPointer(2);

lazy_static! {
    pub static ref ALLOCATOR_MAPPING: EnumMap<AllocationSemantics, AllocatorSelector> = enum_map! {
        AllocationSemantics::Default => AllocatorSelector::BumpPointer(0),
        AllocationSemantics::Immortal => AllocatorSelector::BumpPointer(1),
        AllocationSemantics::Los => AllocatorSelector::LargeObject(0),
    };
}

pub fn gencopy_mutator_release<VM: VMBinding>(mutator: &mut Mutator<VM>, _tls: VMWorkerThread) {
    // reset nursery allocator
    mutator
        .allocator_impl_mut::<BumpAllocator<VM>>(ALLOCATOR_MAPPING[AllocationSemantics::Default])
        .reset();
    // the semispaces may have flipped
    let plan: &'static dyn Plan<VM = VM> = mutator.plan;
    if let Some(plan) = plan.downcast_ref::<GenCopy<VM>>() {
        mutator.allocator_impl_mut::<BumpAllocator<VM>>(PRETENURE).rebind(plan.tospace());
    }
}

pub fn create_gencopy_mutator<VM: VMBinding>(mutator_tls: VMMutatorThread, mmtk: &'static MMTK<VM>) -> Mutator<VM> {
    let plan = match mmtk.get_plan().downcast_ref::<GenCopy<VM>>() {
        Some(plan) => plan,
        None => panic!("The plan is not GenCopy"),
    };
    let config = MutatorConfig {
        allocator_mapping: &*ALLOCATOR_MAPPING,
        space_mapping: Box::new(vec![
            (AllocatorSelector::BumpPointer(0), &plan.gen.nursery),
            (AllocatorSelector::BumpPointer(1), plan.gen.common.get_immortal()),
            (AllocatorSelector::LargeObject(0), plan.gen.common.get_los()),
            (PRETENURE, plan.tospace()),
        ]),
        pretenure: Some(PRETENURE),
        prepare_func: &common_prepare_func::<VM>,
        release_func: &gencopy_mutator_release::<VM>,
    };

    let barrier = Box::new(ObjectRememberingBarrier::<VM>::new(
        plan.gen.modbuf.clone(),
        plan.base().stats.clone(),
    ));
    Mutator::new(mutator_tls, mmtk, barrier, config)
}

use super::GenRC;
use crate::plan::barriers::RCBarrier;
use crate::plan::mutator_context::{common_prepare_func, Mutator, MutatorConfig};
use crate::plan::{AllocationSemantics, Plan};
use crate::util::alloc::{AllocatorSelector, BumpAllocator};
use crate::util::opaque_pointer::{VMMutatorThread, VMWorkerThread};
use crate::vm::VMBinding;
use crate::MMTK;
use enum_map::{enum_map, EnumMap};

/// Pretenured objects go straight to the reference counted space.
const PRETENURE: AllocatorSelector = AllocatorSelector::FreeList(0);

lazy_static! {
    pub static ref ALLOCATOR_MAPPING: EnumMap<AllocationSemantics, AllocatorSelector> = enum_map! {
        AllocationSemantics::Default => AllocatorSelector::BumpPointer(0),
        AllocationSemantics::Immortal => AllocatorSelector::BumpPointer(1),
        AllocationSemantics::Los => AllocatorSelector::LargeObject(0),
    };
}

pub fn genrc_mutator_release<VM: VMBinding>(mutator: &mut Mutator<VM>, _tls: VMWorkerThread) {
    // The nursery is empty after every GC.
    mutator
        .allocator_impl_mut::<BumpAllocator<VM>>(ALLOCATOR_MAPPING[AllocationSemantics::Default])
        .reset();
}

pub fn create_genrc_mutator<VM: VMBinding>(mutator_tls: VMMutatorThread, mmtk: &'static MMTK<VM>) -> Mutator<VM> {
    let plan = match mmtk.get_plan().downcast_ref::<GenRC<VM>>() {
        Some(plan) => plan,
        None => panic!("The plan is not GenRC"),
    };
    let config = MutatorConfig {
        allocator_mapping: &*ALLOCATOR_MAPPING,
        space_mapping: Box::new(vec![
            (AllocatorSelector::BumpPointer(0), &plan.nursery),
            (AllocatorSelector::BumpPointer(1), plan.common().get_immortal()),
            (AllocatorSelector::LargeObject(0), plan.common().get_los()),
            (PRETENURE, &plan.rc.rc_space),
        ]),
        pretenure: Some(PRETENURE),
        prepare_func: &common_prepare_func::<VM>,
        release_func: &genrc_mutator_release::<VM>,
    };

    let barrier = Box::new(RCBarrier::<VM>::new(
        plan.rc.modbuf.clone(),
        plan.rc.decbuf.clone(),
        plan.base().stats.clone(),
    ));
    Mutator::new(mutator_tls, mmtk, barrier, config)
}

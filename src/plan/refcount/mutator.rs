use super::RefCount;
use crate::plan::barriers::RCBarrier;
use crate::plan::mutator_context::{common_prepare_func, no_op_release_func, Mutator, MutatorConfig};
use crate::plan::{AllocationSemantics, Plan};
use crate::util::alloc::AllocatorSelector;
use crate::util::opaque_pointer::VMMutatorThread;
use crate::vm::VMBinding;
use crate::MMTK;
use enum_map::{enum_map, EnumMap};

lazy_static! {
    pub static ref ALLOCATOR_MAPPING: EnumMap<AllocationSemantics, AllocatorSelector> = enum_map! {
        AllocationSemantics::Default => AllocatorSelector::FreeList(0),
        AllocationSemantics::Immortal => AllocatorSelector::BumpPointer(0),
        AllocationSemantics::Los => AllocatorSelector::LargeObject(0),
    };
}

pub fn create_rc_mutator<VM: VMBinding>(mutator_tls: VMMutatorThread, mmtk: &'static MMTK<VM>) -> Mutator<VM> {
    let plan = match mmtk.get_plan().downcast_ref::<RefCount<VM>>() {
        Some(plan) => plan,
        None => panic!("The plan is not RefCount"),
    };
    let config = MutatorConfig {
        allocator_mapping: &*ALLOCATOR_MAPPING,
        space_mapping: Box::new(vec![
            (AllocatorSelector::FreeList(0), &plan.rc.rc_space),
            (AllocatorSelector::BumpPointer(0), plan.common().get_immortal()),
            (AllocatorSelector::LargeObject(0), plan.common().get_los()),
        ]),
        pretenure: None,
        prepare_func: &common_prepare_func::<VM>,
        release_func: &no_op_release_func::<VM>,
    };

    let barrier = Box::new(RCBarrier::<VM>::new(
        plan.rc.modbuf.clone(),
        plan.rc.decbuf.clone(),
        plan.base().stats.clone(),
    ));
    Mutator::new(mutator_tls, mmtk, barrier, config)
}

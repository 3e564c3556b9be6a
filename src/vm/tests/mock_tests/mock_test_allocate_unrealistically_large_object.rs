use super::mock_test_prelude::*;
use crate::util::alloc::AllocationError;

fn alloc_too_large(plan: PlanSelector) {
    let mut fixture = MutatorFixture::create(plan, MB);
    let addr = memory_manager::alloc(&mut fixture.mutator, 2 * MB, 8, 0, AllocationSemantics::Default);
    assert!(addr.is_zero());
    assert_eq!(oom_errors(), vec![AllocationError::HeapOutOfMemory]);
    // No GC is attempted for an allocation that can never fit.
    assert_eq!(fixture.mmtk.get_stats().gc_count(), 0);

    // Small allocations still work.
    let o = fixture.alloc(1, 0);
    assert!(!o.to_raw_address().is_zero());
}

#[test]
pub fn allocate_larger_than_heap_gencopy() {
    with_mockvm(|| alloc_too_large(PlanSelector::GenCopy))
}

#[test]
pub fn allocate_larger_than_heap_marksweep() {
    with_mockvm(|| alloc_too_large(PlanSelector::MarkSweep))
}

#[test]
pub fn allocate_larger_than_heap_genrc() {
    with_mockvm(|| alloc_too_large(PlanSelector::GenRC))
}

#[test]
pub fn allocate_larger_than_heap_refcount() {
    with_mockvm(|| alloc_too_large(PlanSelector::RefCount))
}

use super::mock_test_prelude::*;
use crate::util::alloc::AllocationError;

#[test]
pub fn allocate_without_initialize_collection() {
    with_mockvm(|| {
        let fixture = MMTKFixture::create_with_builder(
            |builder| {
                builder.options.plan = PlanSelector::MarkSweep;
                builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
            },
            false,
        );
        let mut mutator = memory_manager::bind_mutator(fixture.mmtk, new_mutator_tls());
        let size = object::bytes_for(0, 60);

        // Without collector threads, allocation succeeds until the space runs
        // out of pages, and then reports out of memory instead of collecting.
        let mut allocated = 0;
        loop {
            let addr = memory_manager::alloc(&mut mutator, size, 8, 0, AllocationSemantics::Default);
            if addr.is_zero() {
                break;
            }
            allocated += 1;
            assert!(allocated < 1_000_000, "Allocation never failed");
        }
        assert!(allocated > 0);
        assert_eq!(oom_errors(), vec![AllocationError::HeapOutOfMemory]);
        assert_eq!(fixture.mmtk.get_stats().gc_count(), 0);
        memory_manager::destroy_mutator(mutator);
    })
}

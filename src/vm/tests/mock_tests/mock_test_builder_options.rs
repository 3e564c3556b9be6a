use super::mock_test_prelude::*;
use crate::MMTKBuilder;

#[test]
pub fn bulk_options_reach_the_plan() {
    with_mockvm(|| {
        let mut builder = MMTKBuilder::new_no_env_vars();
        assert!(builder.set_options_bulk_by_str("plan=RefCount gc_trigger=FixedHeapSize:2M threads=1 cycle_detection=false"));
        assert_eq!(builder.options.plan, PlanSelector::RefCount);
        assert_eq!(builder.options.gc_trigger, GCTriggerSelector::FixedHeapSize(2 * MB));
        assert_eq!(builder.options.threads, 1);
        assert!(!builder.options.cycle_detection);

        let fixture = MMTKFixture::create_with_builder(
            |b| assert!(b.set_options_bulk_by_str("plan=RefCount gc_trigger=FixedHeapSize:2M")),
            true,
        );
        assert!(fixture.mmtk.get_plan().rc_base().is_some());
        assert_eq!(memory_manager::total_bytes(fixture.mmtk), 2 * MB);
        assert_eq!(
            memory_manager::get_allocator_mapping(fixture.mmtk, AllocationSemantics::Default),
            crate::util::alloc::AllocatorSelector::FreeList(0)
        );
    })
}

#[test]
pub fn bad_options_are_rejected() {
    let mut builder = MMTKBuilder::new_no_env_vars();
    assert!(!builder.set_options_bulk_by_str("plan=NoSuchPlan"));
    assert!(!builder.set_options_bulk_by_str("threads"));
    assert!(!builder.set_option("nursery_fraction", "1.5"));
    assert_eq!(builder.options.plan, PlanSelector::GenRC);
    assert_eq!(builder.options.nursery_fraction, 0.25);
}

#[test]
pub fn user_collection_requests_can_be_ignored() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create_with_builder(|builder| {
            builder.options.plan = PlanSelector::MarkSweep;
            builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
            builder.options.ignore_system_gc = true;
        });
        memory_manager::handle_user_collection_request(fixture.mmtk, fixture.tls, false);
        assert_eq!(fixture.mmtk.get_stats().gc_count(), 0);

        // Forced requests are served anyway.
        fixture.gc();
        assert_eq!(fixture.mmtk.get_stats().gc_count(), 1);
        assert_eq!(fixture.mmtk.get_stats().triggered_by(TriggerReason::External), 1);
    })
}

#[test]
pub fn async_collection_needs_initialized_collector() {
    with_mockvm(|| {
        let fixture = MMTKFixture::create_with_builder(
            |builder| {
                builder.options.plan = PlanSelector::MarkSweep;
                builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
            },
            false,
        );
        assert!(!memory_manager::trigger_async_collection(fixture.mmtk));
        assert_eq!(fixture.mmtk.get_stats().gc_count(), 0);
    })
}

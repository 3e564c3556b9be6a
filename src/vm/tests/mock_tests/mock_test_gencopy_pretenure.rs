use super::mock_test_prelude::*;
use crate::plan::gencopy::GenCopy;
use crate::policy::space::Space;
use crate::MMTK;

fn gencopy(fixture: &MutatorFixture) -> &'static GenCopy<MockVM> {
    let mmtk: &'static MMTK<MockVM> = fixture.mmtk;
    mmtk.get_plan().downcast_ref::<GenCopy<MockVM>>().unwrap()
}

fn nursery_gc_fixture() -> MutatorFixture {
    MutatorFixture::create_with_builder(|builder| {
        builder.options.plan = PlanSelector::GenCopy;
        builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
        // User requests collect the nursery only.
        builder.options.full_heap_system_gc = false;
    })
}

#[test]
pub fn pretenured_object_skips_the_nursery() {
    with_mockvm(|| {
        let mut fixture = nursery_gc_fixture();
        let young = fixture.alloc(0, 0);
        let old = fixture
            .try_alloc(Shape::new(1, 0, 0), AllocationSemantics::Default, AllocationHint::Pretenure)
            .unwrap();
        let plan = gencopy(&fixture);
        assert!(plan.gen.nursery.in_space(young));
        assert!(!plan.gen.nursery.in_space(old));
        assert!(plan.tospace().in_space(old));
    })
}

#[test]
pub fn nursery_gc_updates_remembered_slots() {
    with_mockvm(|| {
        let mut fixture = nursery_gc_fixture();
        let old = fixture
            .try_alloc(Shape::new(1, 0, 0), AllocationSemantics::Default, AllocationHint::Pretenure)
            .unwrap();
        fixture.add_root(old);
        fixture.gc();
        assert!(gencopy(&fixture).gen.is_current_gc_nursery());
        // Mature objects do not move in a nursery GC.
        assert_eq!(fixture.root(0), old);

        // The only path to the young object is through the mature one.
        let young = fixture.alloc(0, 1);
        object::set_data(fixture.heap(), young, 0, 5);
        fixture.write(old, 0, Some(young));
        fixture.gc();

        let promoted = fixture.read(old, 0).unwrap();
        assert_ne!(promoted, young);
        assert!(gencopy(&fixture).tospace().in_space(promoted));
        assert_eq!(object::get_data(fixture.heap(), promoted, 0), 5);
        assert_eq!(fixture.root(0), old);
    })
}

#[test]
pub fn large_objects_ignore_the_hint() {
    with_mockvm(|| {
        let mut fixture = nursery_gc_fixture();
        let big = fixture
            .try_alloc(Shape::new(0, 2048, 0), AllocationSemantics::Los, AllocationHint::Pretenure)
            .unwrap();
        assert!(gencopy(&fixture).gen.common.get_los().in_space(big));
    })
}

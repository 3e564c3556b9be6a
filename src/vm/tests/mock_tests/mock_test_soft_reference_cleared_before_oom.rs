use super::mock_test_prelude::*;

// About half a kilobyte each.
const FILLER: Shape = Shape::new(0, 60, 0);

#[test]
pub fn soft_referent_is_cleared_before_out_of_memory() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create(PlanSelector::MarkSweep, MB);
        let reference = fixture.alloc_with(Shape::new(0, 1, object::SOFT_REFERENCE), AllocationSemantics::Default);
        fixture.add_root(reference);
        // 64KB, only reachable through the soft reference.
        let referent = fixture.alloc_with(Shape::new(0, 8000, 0), AllocationSemantics::Los);
        memory_manager::add_soft_candidate(fixture.mmtk, reference, referent);

        let mut allocated = 0;
        while object::referent(fixture.heap(), reference).is_some() {
            assert!(allocated < 10_000, "The heap never filled up");
            let filler = fixture
                .try_alloc(FILLER, AllocationSemantics::Default, AllocationHint::None)
                .expect("Out of memory while the soft referent was still alive");
            fixture.add_root(filler);
            allocated += 1;
        }
        // MarkSweep does not move objects.
        assert_eq!(fixture.root(0), reference);
        assert!(fixture.mmtk.get_stats().triggered_by(TriggerReason::Internal) >= 1);

        // The referent's pages serve new allocations.
        for _ in 0..16 {
            let filler = fixture.alloc_with(FILLER, AllocationSemantics::Default);
            fixture.add_root(filler);
        }
        assert!(oom_errors().is_empty());
    })
}

#[test]
pub fn soft_referent_survives_while_memory_is_plentiful() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create(PlanSelector::MarkSweep, MB);
        let reference = fixture.alloc_with(Shape::new(0, 1, object::SOFT_REFERENCE), AllocationSemantics::Default);
        fixture.add_root(reference);
        let referent = fixture.alloc(1, 0);
        memory_manager::add_soft_candidate(fixture.mmtk, reference, referent);

        fixture.gc();
        fixture.gc();
        assert_eq!(object::referent(fixture.heap(), reference), Some(referent));
        assert!(fixture.is_live(referent));
    })
}

#[test]
pub fn soft_referent_is_cleared_when_counted_away() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create(PlanSelector::RefCount, MB);
        let reference = fixture.alloc_with(Shape::new(0, 1, object::SOFT_REFERENCE), AllocationSemantics::Default);
        fixture.add_root(reference);
        let referent = fixture.alloc(1, 0);
        memory_manager::add_soft_candidate(fixture.mmtk, reference, referent);

        fixture.gc();
        assert_eq!(object::referent(fixture.heap(), reference), None);
        assert!(!fixture.is_live(referent));
        assert!(fixture.is_live(reference));
    })
}

use super::mock_test_prelude::*;
use crate::policy::space::Space;
use crate::MMTK;

fn rc_fixture(cycle_detection: bool) -> MutatorFixture {
    MutatorFixture::create_with_builder(|builder| {
        builder.options.plan = PlanSelector::RefCount;
        builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
        builder.options.cycle_detection = cycle_detection;
        // Exact counts can only be checked when cycles are reclaimed.
        builder.options.rc_sanity_check = cycle_detection;
    })
}

fn allocated_objects(fixture: &MutatorFixture) -> usize {
    fixture.mmtk.get_plan().rc_base().unwrap().rc_space.allocated_objects()
}

/// A -> B -> A, rooted through A for one GC, then dropped.
fn build_cycle(fixture: &mut MutatorFixture) -> (ObjectReference, ObjectReference) {
    let a = fixture.alloc(1, 0);
    let b = fixture.alloc(1, 0);
    fixture.write(a, 0, Some(b));
    fixture.write(b, 0, Some(a));
    fixture.add_root(a);
    fixture.gc();
    assert!(fixture.is_live(a));
    assert!(fixture.is_live(b));
    fixture.clear_roots();
    (a, b)
}

#[test]
pub fn garbage_cycle_is_reclaimed() {
    with_mockvm(|| {
        let mut fixture = rc_fixture(true);
        let (a, b) = build_cycle(&mut fixture);
        let before = allocated_objects(&fixture);
        let live_before = fixture.mmtk.get_plan().rc_base().unwrap().live_objects();

        fixture.gc();
        assert!(!fixture.is_live(a));
        assert!(!fixture.is_live(b));
        assert_eq!(allocated_objects(&fixture), before - 2);
        assert_eq!(fixture.mmtk.get_plan().rc_base().unwrap().live_objects(), live_before - 2);
        assert!(fixture.mmtk.get_plan().last_collection_was_exhaustive());
    })
}

#[test]
pub fn garbage_cycle_leaks_without_cycle_detection() {
    with_mockvm(|| {
        let mut fixture = rc_fixture(false);
        let (a, b) = build_cycle(&mut fixture);
        let before = allocated_objects(&fixture);

        fixture.gc();
        fixture.gc();
        assert!(fixture.is_live(a));
        assert!(fixture.is_live(b));
        assert_eq!(allocated_objects(&fixture), before);
        assert!(!fixture.mmtk.get_plan().last_collection_was_exhaustive());
    })
}

#[test]
pub fn cycle_with_external_reference_survives() {
    with_mockvm(|| {
        let mut fixture = rc_fixture(true);
        let holder = fixture.alloc(1, 0);
        fixture.add_root(holder);
        let (a, b) = build_cycle(&mut fixture);
        // build_cycle dropped every root; root the holder again and point it at the cycle.
        fixture.add_root(holder);
        fixture.write(holder, 0, Some(b));

        fixture.gc();
        fixture.gc();
        assert!(fixture.is_live(a));
        assert!(fixture.is_live(b));

        // Cut the only external edge. The cycle is garbage now.
        fixture.write(holder, 0, None);
        fixture.gc();
        assert!(!fixture.is_live(a));
        assert!(!fixture.is_live(b));
        assert!(fixture.is_live(holder));
    })
}

#[test]
pub fn blocks_emptied_by_cycle_collection_are_released() {
    with_mockvm(|| {
        let mut fixture = rc_fixture(true);
        let mmtk: &'static MMTK<MockVM> = fixture.mmtk;
        let rc_space = &mmtk.get_plan().rc_base().unwrap().rc_space;
        let pages_before = rc_space.reserved_pages();

        // A ring of 1 KB objects, in a size class nothing else uses.
        let ring: Vec<ObjectReference> = (0..16).map(|_| fixture.alloc(1, 124)).collect();
        for i in 0..ring.len() {
            fixture.write(ring[i], 0, Some(ring[(i + 1) % ring.len()]));
        }
        fixture.add_root(ring[0]);
        fixture.gc();
        assert!(rc_space.reserved_pages() > pages_before);

        fixture.clear_roots();
        fixture.gc();
        assert!(ring.iter().all(|o| !fixture.is_live(*o)));
        assert_eq!(rc_space.reserved_pages(), pages_before);
    })
}

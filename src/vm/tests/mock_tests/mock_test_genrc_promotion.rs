use super::mock_test_prelude::*;
use crate::plan::genrc::GenRC;
use crate::policy::space::Space;
use crate::MMTK;

fn genrc_fixture() -> MutatorFixture {
    MutatorFixture::create_with_builder(|builder| {
        builder.options.plan = PlanSelector::GenRC;
        builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
        builder.options.rc_sanity_check = true;
    })
}

fn genrc(fixture: &MutatorFixture) -> &'static GenRC<MockVM> {
    let mmtk: &'static MMTK<MockVM> = fixture.mmtk;
    mmtk.get_plan().downcast_ref::<GenRC<MockVM>>().unwrap()
}

#[test]
pub fn survivors_are_promoted_and_counted() {
    with_mockvm(|| {
        let mut fixture = genrc_fixture();
        let before = genrc(&fixture).rc.rc_space.allocated_objects();

        let a = fixture.alloc(1, 1);
        let b = fixture.alloc(0, 1);
        fixture.write(a, 0, Some(b));
        object::set_data(fixture.heap(), a, 0, 11);
        object::set_data(fixture.heap(), b, 0, 22);
        fixture.add_root(a);
        // Garbage stays behind in the nursery.
        for _ in 0..10 {
            fixture.alloc(1, 0);
        }
        assert!(genrc(&fixture).nursery.in_space(a));

        fixture.gc();
        let plan = genrc(&fixture);
        let a = fixture.root(0);
        let b = fixture.read(a, 0).unwrap();
        assert!(plan.rc.rc_space.in_space(a));
        assert!(plan.rc.rc_space.in_space(b));
        assert_eq!(object::get_data(fixture.heap(), a, 0), 11);
        assert_eq!(object::get_data(fixture.heap(), b, 0), 22);
        assert_eq!(plan.rc.rc_space.allocated_objects(), before + 2);
        assert!(fixture.mmtk.get_plan().last_collection_was_exhaustive());

        // A promoted object stays where it is.
        fixture.gc();
        assert_eq!(fixture.root(0), a);
        assert_eq!(fixture.read(a, 0), Some(b));
    })
}

#[test]
pub fn mature_to_nursery_reference_is_remembered() {
    with_mockvm(|| {
        let mut fixture = genrc_fixture();
        let a = fixture.alloc(1, 0);
        let b = fixture.alloc(0, 0);
        fixture.write(a, 0, Some(b));
        fixture.add_root(a);
        fixture.gc();
        let plan = genrc(&fixture);
        let a = fixture.root(0);
        let old_b = fixture.read(a, 0).unwrap();
        let promoted = plan.rc.rc_space.allocated_objects();

        // Only the barrier knows about this edge.
        let c = fixture.alloc(0, 1);
        object::set_data(fixture.heap(), c, 0, 33);
        fixture.write(a, 0, Some(c));
        fixture.gc();

        let new_c = fixture.read(a, 0).unwrap();
        assert!(plan.rc.rc_space.in_space(new_c));
        assert_eq!(object::get_data(fixture.heap(), new_c, 0), 33);
        // The overwritten target lost its only reference.
        assert!(!fixture.is_live(old_b));
        assert_eq!(plan.rc.rc_space.allocated_objects(), promoted);
    })
}

#[test]
pub fn dropped_roots_are_freed() {
    with_mockvm(|| {
        let mut fixture = genrc_fixture();
        let before = genrc(&fixture).rc.rc_space.allocated_objects();
        let mut prev = None;
        for _ in 0..50 {
            let o = fixture.alloc(1, 0);
            fixture.write(o, 0, prev);
            prev = Some(o);
        }
        fixture.add_root(prev.unwrap());
        fixture.gc();
        assert_eq!(genrc(&fixture).rc.rc_space.allocated_objects(), before + 50);

        fixture.clear_roots();
        fixture.gc();
        assert_eq!(genrc(&fixture).rc.rc_space.allocated_objects(), before);
        assert_eq!(genrc(&fixture).rc.live_objects(), 0);
    })
}

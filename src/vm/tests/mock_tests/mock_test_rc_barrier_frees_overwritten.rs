use super::mock_test_prelude::*;
use crate::util::header::{rc, HeaderWord};

fn rc_fixture() -> MutatorFixture {
    MutatorFixture::create_with_builder(|builder| {
        builder.options.plan = PlanSelector::RefCount;
        builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
        builder.options.rc_sanity_check = true;
    })
}

#[test]
pub fn overwritten_target_is_freed() {
    with_mockvm(|| {
        let mut fixture = rc_fixture();
        let holder = fixture.alloc(1, 0);
        let first = fixture.alloc(0, 0);
        let second = fixture.alloc(0, 0);
        fixture.add_root(holder);
        fixture.write(holder, 0, Some(first));
        fixture.gc();
        assert!(fixture.is_live(first));
        // Nothing refers to it.
        assert!(!fixture.is_live(second));

        fixture.write(holder, 0, Some(first));
        fixture.write(holder, 0, None);
        fixture.gc();
        assert!(!fixture.is_live(first));
        assert!(fixture.is_live(holder));
        assert_eq!(fixture.read(holder, 0), None);
    })
}

#[test]
pub fn coalesced_writes_only_count_the_last_target() {
    with_mockvm(|| {
        let mut fixture = rc_fixture();
        let holder = fixture.alloc(1, 0);
        fixture.add_root(holder);
        fixture.gc();

        // Several stores to one slot between two GCs: only the value before
        // the first and the value after the last matter.
        let targets: Vec<ObjectReference> = (0..5).map(|_| fixture.alloc(0, 0)).collect();
        for &t in targets.iter() {
            fixture.write(holder, 0, Some(t));
        }
        fixture.gc();
        let last = *targets.last().unwrap();
        assert!(fixture.is_live(last));
        for &t in &targets[..4] {
            assert!(!fixture.is_live(t));
        }
        let word = memory_manager::read_bits(fixture.mmtk, last, HeaderWord::RefCount);
        assert_eq!(rc::COUNT.extract(word), 1);
    })
}

#[test]
pub fn freed_children_are_decremented_recursively() {
    with_mockvm(|| {
        let mut fixture = rc_fixture();
        let holder = fixture.alloc(1, 0);
        fixture.add_root(holder);
        let mut chain = vec![];
        let mut prev = None;
        for _ in 0..20 {
            let o = fixture.alloc(1, 0);
            fixture.write(o, 0, prev);
            chain.push(o);
            prev = Some(o);
        }
        fixture.write(holder, 0, prev);
        fixture.gc();
        assert!(chain.iter().all(|&o| fixture.is_live(o)));

        fixture.write(holder, 0, None);
        fixture.gc();
        assert!(chain.iter().all(|&o| !fixture.is_live(o)));
        assert_eq!(fixture.mmtk.get_plan().rc_base().unwrap().live_objects(), 1);
    })
}

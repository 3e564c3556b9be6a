use super::mock_test_prelude::*;
use crate::util::header::{rc, HeaderWord};

const LEN: usize = 4;
const ARRAY: Shape = Shape::new(LEN, 0, object::REF_ARRAY);

#[test]
pub fn region_copy_is_counted() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create_with_builder(|builder| {
            builder.options.plan = PlanSelector::RefCount;
            builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
            builder.options.rc_sanity_check = true;
        });
        let src = fixture.alloc_with(ARRAY, AllocationSemantics::Default);
        let dst = fixture.alloc_with(ARRAY, AllocationSemantics::Default);
        fixture.add_root(src);
        fixture.add_root(dst);
        let new_targets: Vec<ObjectReference> = (0..LEN).map(|_| fixture.alloc(0, 0)).collect();
        let old_targets: Vec<ObjectReference> = (0..LEN).map(|_| fixture.alloc(0, 0)).collect();
        for i in 0..LEN {
            fixture.write(src, i, Some(new_targets[i]));
            fixture.write(dst, i, Some(old_targets[i]));
        }
        fixture.gc();

        memory_manager::memory_region_copy(
            &mut fixture.mutator,
            object::ref_slot(src, 0),
            dst,
            object::ref_slot(dst, 0),
            LEN,
        );
        for i in 0..LEN {
            assert_eq!(fixture.read(dst, i), Some(new_targets[i]));
        }
        fixture.gc();

        for i in 0..LEN {
            assert!(!fixture.is_live(old_targets[i]));
            assert!(fixture.is_live(new_targets[i]));
            let word = memory_manager::read_bits(fixture.mmtk, new_targets[i], HeaderWord::RefCount);
            assert_eq!(rc::COUNT.extract(word), 2);
        }
    })
}

#[test]
pub fn region_copy_into_mature_array_is_remembered() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create_with_builder(|builder| {
            builder.options.plan = PlanSelector::GenCopy;
            builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
            builder.options.full_heap_system_gc = false;
        });
        let dst = fixture.alloc_with(ARRAY, AllocationSemantics::Default);
        fixture.add_root(dst);
        fixture.gc();
        let dst = fixture.root(0);

        // A young array, only reachable from the stack until the copy.
        let src = fixture.alloc_with(ARRAY, AllocationSemantics::Default);
        for i in 0..LEN {
            let t = fixture.alloc(0, 1);
            object::set_data(fixture.heap(), t, 0, i);
            fixture.write(src, i, Some(t));
        }
        memory_manager::memory_region_copy(
            &mut fixture.mutator,
            object::ref_slot(src, 0),
            dst,
            object::ref_slot(dst, 0),
            LEN,
        );
        fixture.gc();

        assert_eq!(fixture.root(0), dst);
        for i in 0..LEN {
            let t = fixture.read(dst, i).unwrap();
            assert!(fixture.is_live(t));
            assert_eq!(object::get_data(fixture.heap(), t, 0), i);
        }
    })
}

use super::mock_test_prelude::*;
use std::collections::HashSet;

const GARBAGE: usize = 2000;

#[test]
pub fn unreachable_objects_are_freed() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create(PlanSelector::MarkSweep, 4 * MB);

        // A small tree: root -> (left, right), left -> leaf.
        let root = fixture.alloc(2, 0);
        let left = fixture.alloc(1, 1);
        let right = fixture.alloc(0, 1);
        let leaf = fixture.alloc(0, 2);
        fixture.write(root, 0, Some(left));
        fixture.write(root, 1, Some(right));
        fixture.write(left, 0, Some(leaf));
        object::set_data(fixture.heap(), leaf, 1, 42);
        fixture.add_root(root);

        let garbage: Vec<ObjectReference> = (0..GARBAGE).map(|_| fixture.alloc(1, 0)).collect();
        let used_before = memory_manager::used_bytes(fixture.mmtk);

        fixture.gc();
        for o in [root, left, right, leaf] {
            assert!(fixture.is_live(o));
        }
        assert!(garbage.iter().all(|&o| !fixture.is_live(o)));
        assert_eq!(fixture.root(0), root);
        assert_eq!(fixture.read(left, 0), Some(leaf));
        assert_eq!(object::get_data(fixture.heap(), leaf, 1), 42);
        assert!(memory_manager::used_bytes(fixture.mmtk) < used_before);

        // The freed cells serve new objects.
        let freed: HashSet<ObjectReference> = garbage.into_iter().collect();
        let fresh: Vec<ObjectReference> = (0..GARBAGE).map(|_| fixture.alloc(1, 0)).collect();
        assert!(fresh.iter().any(|o| freed.contains(o)));
        assert!(memory_manager::used_bytes(fixture.mmtk) <= used_before);
        assert!(fixture.is_live(leaf));
    })
}

#[test]
pub fn objects_reachable_from_global_roots_survive() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create(PlanSelector::MarkSweep, MB);
        let global = fixture.alloc(1, 0);
        let child = fixture.alloc(0, 0);
        fixture.write(global, 0, Some(child));
        add_global_root(global);

        fixture.gc();
        assert!(fixture.is_live(global));
        assert!(fixture.is_live(child));
        assert_eq!(global_roots(), vec![global]);

        set_global_roots(vec![]);
        fixture.gc();
        assert!(!fixture.is_live(global));
        assert!(!fixture.is_live(child));
    })
}

#[test]
pub fn repeated_collections_keep_a_live_list() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create(PlanSelector::MarkSweep, MB);
        let head = fixture.alloc(1, 1);
        fixture.add_root(head);
        let mut tail = head;
        for i in 0..100 {
            let next = fixture.alloc(1, 1);
            object::set_data(fixture.heap(), next, 0, i);
            fixture.write(tail, 0, Some(next));
            tail = next;
            // Interleave garbage with the list.
            fixture.alloc(1, 1);
        }
        for _ in 0..3 {
            fixture.gc();
        }

        let mut cursor = fixture.read(head, 0);
        let mut i = 0;
        while let Some(o) = cursor {
            assert!(fixture.is_live(o));
            assert_eq!(object::get_data(fixture.heap(), o, 0), i);
            cursor = fixture.read(o, 0);
            i += 1;
        }
        assert_eq!(i, 100);
        assert_eq!(fixture.mmtk.get_stats().gc_count(), 3);
    })
}

use super::mock_test_prelude::*;
use std::collections::HashSet;

const OBJECTS: usize = 1000;

// 32-byte objects in a 1MB heap whose nursery (1/64 of the heap, 4 pages)
// holds about 500 of them.
#[test]
pub fn nursery_overflow_keeps_every_object() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create_with_builder(|builder| {
            builder.options.plan = PlanSelector::GenCopy;
            builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
            builder.options.nursery_fraction = 0.015625;
        });
        assert_eq!(object::bytes_for(1, 0), 32);

        for i in 0..OBJECTS {
            let o = fixture.alloc(1, 0);
            if i > 0 {
                // The previous object may have moved in a GC triggered by this allocation.
                let prev = fixture.root(i - 1);
                fixture.write(o, 0, Some(prev));
            }
            assert_eq!(fixture.add_root(o), i);
        }
        assert!(fixture.mmtk.get_stats().gc_count() >= 1);
        assert!(fixture.mmtk.get_stats().triggered_by(TriggerReason::Resource) >= 1);

        let roots = fixture.roots();
        let distinct: HashSet<ObjectReference> = roots.iter().copied().collect();
        assert_eq!(distinct.len(), OBJECTS);
        for i in 1..OBJECTS {
            assert_eq!(fixture.read(roots[i], 0), Some(roots[i - 1]));
        }

        // Every object is still writable.
        for i in 0..OBJECTS {
            let target = roots[(i + 1) % OBJECTS];
            fixture.write(roots[i], 0, Some(target));
            assert_eq!(fixture.read(roots[i], 0), Some(target));
        }
        assert!(oom_errors().is_empty());
    })
}

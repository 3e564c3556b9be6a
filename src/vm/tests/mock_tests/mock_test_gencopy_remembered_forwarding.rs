use super::mock_test_prelude::*;

/// `a` is mature and rooted, and its barrier has remembered it when a full
/// heap GC starts. Root scanning copies it before the remembered set is
/// processed, so its old status word holds the forwarding pointer.
fn remembered_root_is_forwarded_once(threads: usize) {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create_with_builder(|builder| {
            builder.options.plan = PlanSelector::GenCopy;
            builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB);
            builder.options.threads = threads;
        });
        let a = fixture.alloc(1, 1);
        let b = fixture.alloc(1, 0);
        object::set_data(fixture.heap(), a, 0, 7);
        fixture.add_root(a);
        fixture.add_root(b);
        fixture.write(b, 0, Some(a));
        fixture.gc();

        let (a, b) = (fixture.root(0), fixture.root(1));
        let c = fixture.alloc(0, 1);
        object::set_data(fixture.heap(), c, 0, 9);
        fixture.write(a, 0, Some(c));
        fixture.gc();

        let (a, b) = (fixture.root(0), fixture.root(1));
        assert_eq!(fixture.read(b, 0), Some(a));
        assert_eq!(object::get_data(fixture.heap(), a, 0), 7);
        let c = fixture.read(a, 0).unwrap();
        assert!(fixture.is_live(c));
        assert_eq!(object::get_data(fixture.heap(), c, 0), 9);

        // The copy is unlogged again, so the barrier still sees the next store.
        fixture.write(a, 0, None);
        fixture.gc();
        let (a, b) = (fixture.root(0), fixture.root(1));
        assert_eq!(fixture.read(b, 0), Some(a));
        assert_eq!(fixture.read(a, 0), None);
    })
}

#[test]
pub fn remembered_root_is_forwarded_once_single_collector() {
    remembered_root_is_forwarded_once(1);
}

#[test]
pub fn remembered_root_is_forwarded_once_parallel_collectors() {
    remembered_root_is_forwarded_once(4);
}

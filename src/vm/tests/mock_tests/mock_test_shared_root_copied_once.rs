use super::mock_test_prelude::*;

#[test]
pub fn object_rooted_by_two_threads_is_copied_once() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create(PlanSelector::GenCopy, MB);
        let other_tls = new_mutator_tls();
        let mut other = memory_manager::bind_mutator(fixture.mmtk, other_tls);
        // The other thread does not run. It must not hold up the GC.
        memory_manager::enter_gc_safe_region(&mut other);

        let shared = fixture.alloc(1, 1);
        let child = fixture.alloc(0, 1);
        fixture.write(shared, 0, Some(child));
        object::set_data(fixture.heap(), shared, 0, 7);
        fixture.add_root(shared);
        add_thread_root(other_tls, shared);
        add_global_root(shared);

        fixture.gc();
        let mine = fixture.root(0);
        let theirs = thread_roots(other_tls)[0];
        let global = global_roots()[0];
        assert_ne!(mine, shared, "A nursery object should have been copied");
        assert_eq!(mine, theirs);
        assert_eq!(mine, global);
        assert_eq!(object::get_data(fixture.heap(), mine, 0), 7);
        let new_child = fixture.read(mine, 0).unwrap();
        assert_eq!(object::get_data(fixture.heap(), new_child, 0), 0);
        assert!(fixture.is_live(mine));

        fixture.gc();
        assert_eq!(thread_roots(other_tls)[0], fixture.root(0));
        assert_eq!(global_roots()[0], fixture.root(0));

        memory_manager::leave_gc_safe_region(&mut other);
        memory_manager::destroy_mutator(other);
    })
}

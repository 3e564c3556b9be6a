use super::mock_test_prelude::*;

#[test]
pub fn harness_collects_and_gathers_statistics() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create(PlanSelector::GenRC, MB);
        let stats = fixture.mmtk.get_stats();
        assert!(!stats.get_gathering_stats());

        memory_manager::harness_begin(fixture.mmtk, fixture.tls);
        assert_eq!(stats.gc_count(), 1);
        assert!(stats.get_gathering_stats());
        assert!(fixture.mmtk.get_state().is_inside_harness());

        let o = fixture.alloc(1, 0);
        fixture.add_root(o);
        fixture.gc();
        assert_eq!(stats.gc_count(), 2);

        memory_manager::harness_end(fixture.mmtk);
        assert!(!stats.get_gathering_stats());
        assert!(!fixture.mmtk.get_state().is_inside_harness());
    })
}

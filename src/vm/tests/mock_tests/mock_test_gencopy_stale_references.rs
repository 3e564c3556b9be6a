use super::mock_test_prelude::*;

#[test]
pub fn stale_addresses_are_not_live() {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create(PlanSelector::GenCopy, MB);
        let young = fixture.alloc(0, 1);
        assert!(fixture.is_live(young));
        fixture.add_root(young);

        // Full heap GCs: nursery to one semispace, then to the other.
        fixture.gc();
        let mature = fixture.root(0);
        assert_ne!(mature, young);
        assert!(fixture.is_live(mature));
        assert!(!fixture.is_live(young));

        fixture.gc();
        let moved = fixture.root(0);
        assert_ne!(moved, mature);
        assert!(fixture.is_live(moved));
        assert!(!fixture.is_live(mature));
    })
}

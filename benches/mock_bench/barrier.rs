use criterion::Criterion;

use ulterior::memory_manager;
use ulterior::util::options::PlanSelector;
use ulterior::util::test_util::fixtures::*;
use ulterior::util::test_util::mock_vm::object;

pub fn bench(c: &mut Criterion) {
    for plan in [PlanSelector::GenCopy, PlanSelector::RefCount] {
        let mut fixture = MutatorFixture::create(plan, 16 * MB);
        let src = fixture.alloc(1, 0);
        let target = fixture.alloc(0, 0);
        fixture.add_root(src);
        fixture.add_root(target);
        fixture.gc();
        let (src, target) = (fixture.root(0), fixture.root(1));
        // Only the first store after the GC takes the slow path.
        c.bench_function(&format!("write_barrier_{}", plan), |b| {
            b.iter(|| {
                memory_manager::object_reference_write(&mut fixture.mutator, src, object::ref_slot(src, 0), Some(target));
            })
        });
    }
}

use criterion::Criterion;

use ulterior::memory_manager;
use ulterior::util::options::PlanSelector;
use ulterior::util::test_util::fixtures::*;
use ulterior::AllocationSemantics;

pub fn bench(c: &mut Criterion) {
    for plan in [PlanSelector::GenCopy, PlanSelector::MarkSweep, PlanSelector::GenRC] {
        // Nothing is rooted, so the occasional GC is cheap.
        let mut fixture = MutatorFixture::create(plan, 64 * MB);
        c.bench_function(&format!("alloc_{}", plan), |b| {
            b.iter(|| {
                let _addr = memory_manager::alloc(&mut fixture.mutator, 32, 8, 0, AllocationSemantics::Default);
            })
        });
    }
}

use criterion::{BatchSize, Criterion};
use std::sync::Arc;

use ulterior::util::constants::HEAP_START;
use ulterior::util::deque::{LocalDeque, MetaDataPool, SharedDeque, CHUNK_ENTRIES};
use ulterior::util::ObjectReference;

const ENTRIES: usize = 16 * CHUNK_ENTRIES;

fn objects() -> Vec<ObjectReference> {
    (0..ENTRIES)
        .map(|i| ObjectReference::from_raw_address(HEAP_START + (i << 4)).unwrap())
        .collect()
}

pub fn bench(c: &mut Criterion) {
    let pool = Arc::new(MetaDataPool::new());
    let objects = objects();

    c.bench_function("deque_push_pop", |b| {
        b.iter_batched(
            || LocalDeque::new(Arc::new(SharedDeque::new("bench", pool.clone()))),
            |mut deque| {
                for &o in objects.iter() {
                    deque.push(o);
                }
                deque.flush();
                while deque.try_pop().is_some() {}
            },
            BatchSize::SmallInput,
        )
    });
}

pub use criterion::Criterion;

mod deque;

pub fn bench(c: &mut Criterion) {
    deque::bench(c);
}

use super::mock_test_prelude::*;
use crate::MMTK;

const THREADS: usize = 4;
const NODES: usize = 3000;

/// Build a list of `NODES` nodes, each pushed at the head, with the head as
/// the only root of this thread. Returns the length found when walking it.
fn build_list(mmtk: &'static MMTK<MockVM>) -> usize {
    let tls = new_mutator_tls();
    let mut mutator = memory_manager::bind_mutator(mmtk, tls);
    let heap = memory_manager::heap(mmtk);
    let bytes = object::bytes_for(1, 1);

    for i in 0..NODES {
        let addr = memory_manager::alloc(&mut mutator, bytes, 8, 0, AllocationSemantics::Default);
        let node = ObjectReference::from_raw_address(addr).expect("Out of memory");
        object::write_shape(heap, node, Shape::new(1, 1, 0));
        memory_manager::post_alloc(&mut mutator, node, bytes, AllocationSemantics::Default);
        object::set_data(heap, node, 0, i);
        // Read the head only after allocating: the allocation may have moved it.
        let head = thread_roots(tls).first().copied();
        memory_manager::object_reference_write(&mut mutator, node, object::ref_slot(node, 0), head);
        set_thread_roots(tls, vec![node]);
        if i == NODES / 2 {
            // Collect while the other threads are still allocating.
            memory_manager::handle_user_collection_request(mmtk, tls, true);
        } else if i % 64 == 0 {
            memory_manager::yieldpoint(&mut mutator);
        }
    }

    let mut length = 0;
    let mut cursor = thread_roots(tls).first().copied();
    while let Some(node) = cursor {
        assert_eq!(object::get_data(heap, node, 0), NODES - 1 - length);
        cursor = object::get_ref(heap, node, 0);
        length += 1;
    }
    memory_manager::destroy_mutator(mutator);
    length
}

fn run_threads(plan: PlanSelector) {
    let fixture = MMTKFixture::create_with_builder(
        |builder| {
            builder.options.plan = plan;
            builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(4 * MB);
            builder.options.nursery_fraction = 0.0625;
        },
        true,
    );
    let mmtk = fixture.mmtk;
    let handles: Vec<_> = (0..THREADS)
        .map(|_| std::thread::spawn(move || build_list(mmtk)))
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), NODES);
    }
    assert!(mmtk.get_stats().gc_count() >= 1);
    assert!(oom_errors().is_empty());
}

#[test]
pub fn multithreaded_gencopy() {
    with_mockvm(|| run_threads(PlanSelector::GenCopy))
}

#[test]
pub fn multithreaded_marksweep() {
    with_mockvm(|| run_threads(PlanSelector::MarkSweep))
}

#[test]
pub fn multithreaded_genrc() {
    with_mockvm(|| run_threads(PlanSelector::GenRC))
}

#[test]
pub fn multithreaded_refcount() {
    with_mockvm(|| run_threads(PlanSelector::RefCount))
}

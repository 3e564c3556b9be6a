use super::mock_test_prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

const FIELDS: usize = 3;
const INITIAL_OBJECTS: usize = 300;
const ROOTS: usize = 8;
const ROUNDS: usize = 6;
const WRITES_PER_ROUND: usize = 200;

/// The expected shape of the heap, indexed by the id stored in each object's first data word.
struct Model {
    edges: Vec<[Option<usize>; FIELDS]>,
    roots: Vec<usize>,
}

fn new_object(fixture: &mut MutatorFixture, model: &mut Model) -> (usize, ObjectReference) {
    let id = model.edges.len();
    let o = fixture.alloc(FIELDS, 1);
    object::set_data(fixture.heap(), o, 0, id);
    model.edges.push([None; FIELDS]);
    (id, o)
}

/// Walk the heap from the roots and compare it with the model. Returns the
/// address of every reachable object.
fn verify(fixture: &MutatorFixture, model: &Model) -> HashMap<usize, ObjectReference> {
    let heap = fixture.heap();
    let mut seen: HashMap<usize, ObjectReference> = HashMap::new();
    let mut stack: Vec<(usize, ObjectReference)> = model.roots.iter().copied().zip(fixture.roots()).collect();
    while let Some((id, o)) = stack.pop() {
        if let Some(prev) = seen.get(&id) {
            // One object, one copy.
            assert_eq!(*prev, o, "object {} reached at two addresses", id);
            continue;
        }
        assert!(fixture.is_live(o), "reachable object {} at {} is not live", id, o);
        assert_eq!(object::get_data(heap, o, 0), id);
        seen.insert(id, o);
        for (i, expected) in model.edges[id].iter().enumerate() {
            match (*expected, fixture.read(o, i)) {
                (None, None) => {}
                (Some(t), Some(target)) => stack.push((t, target)),
                (e, a) => panic!("object {} field {}: expected {:?}, found {:?}", id, i, e, a),
            }
        }
    }
    seen
}

fn mutate(fixture: &mut MutatorFixture, model: &mut Model, rng: &mut ChaCha8Rng, live: &mut HashMap<usize, ObjectReference>) {
    let mut ids: Vec<usize> = live.keys().copied().collect();
    ids.sort_unstable();
    for _ in 0..WRITES_PER_ROUND {
        let src = ids[rng.random_range(0..ids.len())];
        let field = rng.random_range(0..FIELDS);
        let target = match rng.random_range(0..10) {
            0..=1 => None,
            2..=3 => {
                let (id, o) = new_object(fixture, model);
                live.insert(id, o);
                ids.push(id);
                Some(id)
            }
            _ => Some(ids[rng.random_range(0..ids.len())]),
        };
        fixture.write(live[&src], field, target.map(|t| live[&t]));
        model.edges[src][field] = target;
    }
}

fn run(plan: PlanSelector, seed: u64) {
    with_mockvm(|| {
        let mut fixture = MutatorFixture::create_with_builder(|builder| {
            builder.options.plan = plan;
            builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(8 * MB);
            builder.options.rc_sanity_check = true;
        });
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut model = Model { edges: vec![], roots: vec![] };

        let objects: Vec<ObjectReference> = (0..INITIAL_OBJECTS).map(|_| new_object(&mut fixture, &mut model).1).collect();
        for (id, &o) in objects.iter().enumerate() {
            for field in 0..FIELDS {
                if rng.random_bool(0.6) {
                    let t = rng.random_range(0..INITIAL_OBJECTS);
                    fixture.write(o, field, Some(objects[t]));
                    model.edges[id][field] = Some(t);
                }
            }
        }
        for _ in 0..ROOTS {
            let id = rng.random_range(0..INITIAL_OBJECTS);
            fixture.add_root(objects[id]);
            model.roots.push(id);
        }

        for _ in 0..ROUNDS {
            fixture.gc();
            let mut live = verify(&fixture, &model);
            mutate(&mut fixture, &mut model, &mut rng, &mut live);
        }
        fixture.gc();
        let live = verify(&fixture, &model);

        fixture.clear_roots();
        model.roots.clear();
        fixture.gc();
        if let Some(rc) = fixture.mmtk.get_plan().rc_base() {
            assert_eq!(rc.live_objects(), 0);
        } else if !fixture.mmtk.get_plan().constraints().moves_objects {
            assert!(live.values().all(|o| !fixture.is_live(*o)));
        }
    })
}

macro_rules! random_graph_tests {
    ($($plan:ident),*) => {
        paste::paste! {
            $(
                #[test]
                pub fn [<random_graph_ $plan:snake>]() {
                    run(PlanSelector::$plan, 0x5eed);
                    run(PlanSelector::$plan, 0xca11ab1e);
                }
            )*
        }
    };
}

random_graph_tests!(GenCopy, MarkSweep, GenRC, RefCount);

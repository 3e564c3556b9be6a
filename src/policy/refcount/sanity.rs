//! Cross-checks reference counts against a trace of the heap.

use crate::util::header::rc;
use crate::util::memory::HeapMemory;
use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, VMBinding};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A disagreement between the reference counts and the trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanityError {
    /// The count of an object is not the number of heap references to it.
    Count {
        object: ObjectReference,
        rc: usize,
        traced: usize,
    },
    /// The root flag of an object does not say whether a root references it.
    Root {
        object: ObjectReference,
        root_flag: bool,
        rooted: bool,
    },
    /// The live object counter is not the number of reachable counted objects.
    LiveObjects { counter: usize, reachable: usize },
}

impl fmt::Display for SanityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanityError::Count { object, rc, traced } => {
                write!(f, "RC sanity: {} has count {} but {} incoming references", object, rc, traced)
            }
            SanityError::Root {
                object,
                root_flag,
                rooted,
            } => write!(f, "RC sanity: {} has root flag {} but rooted={}", object, root_flag, rooted),
            SanityError::LiveObjects { counter, reachable } => write!(
                f,
                "RC sanity: {} live objects counted but {} reachable",
                counter, reachable
            ),
        }
    }
}

impl std::error::Error for SanityError {}

/// The result of a sanity trace.
#[derive(Debug, Default)]
pub struct SanityReport {
    /// Counted objects reached by the trace.
    pub reachable: usize,
    /// Heap edges into counted objects.
    pub edges: usize,
}

/// Trace from `roots` and `sources` and compare what it finds with the RC
/// words of counted objects.
///
/// `roots` are the references held by roots; they do not count. `sources`
/// are objects that are always live (such as immortal objects), whose
/// fields do count. With `exact` unset, unreachable garbage may still hold
/// counts, so a count may exceed the traced references and the live counter
/// may exceed the reachable objects.
pub struct SanityChecker<'a, VM: VMBinding> {
    heap: &'a HeapMemory,
    is_rc_object: &'a dyn Fn(ObjectReference) -> bool,
    exact: bool,
    _p: std::marker::PhantomData<VM>,
}

impl<'a, VM: VMBinding> SanityChecker<'a, VM> {
    pub fn new(heap: &'a HeapMemory, is_rc_object: &'a dyn Fn(ObjectReference) -> bool, exact: bool) -> Self {
        SanityChecker {
            heap,
            is_rc_object,
            exact,
            _p: std::marker::PhantomData,
        }
    }

    pub fn check(
        &self,
        roots: &[ObjectReference],
        sources: &[ObjectReference],
        live_objects: usize,
    ) -> Result<SanityReport, SanityError> {
        let rooted: HashSet<ObjectReference> = roots.iter().copied().collect();
        let mut incoming: HashMap<ObjectReference, usize> = HashMap::new();
        let mut visited: HashSet<ObjectReference> = HashSet::new();
        let mut stack: Vec<ObjectReference> = roots.iter().chain(sources.iter()).copied().collect();
        let mut report = SanityReport::default();

        while let Some(object) = stack.pop() {
            if !visited.insert(object) {
                continue;
            }
            VM::VMObjectModel::scan_object(self.heap, object, &mut |slot: Address| {
                if let Some(child) = self.heap.load_reference(slot) {
                    if (self.is_rc_object)(child) {
                        *incoming.entry(child).or_insert(0) += 1;
                        report.edges += 1;
                    }
                    stack.push(child);
                }
            });
        }

        for &object in visited.iter().filter(|&&o| (self.is_rc_object)(o)) {
            report.reachable += 1;
            let traced = incoming.get(&object).copied().unwrap_or(0);
            if !rc::is_saturated(self.heap, object) {
                let count = rc::get_rc(self.heap, object);
                let ok = if self.exact { count == traced } else { count >= traced };
                if !ok {
                    return Err(SanityError::Count {
                        object,
                        rc: count,
                        traced,
                    });
                }
            }
            let root_flag = rc::is_root_reachable(self.heap, object);
            let is_rooted = rooted.contains(&object);
            if root_flag != is_rooted {
                return Err(SanityError::Root {
                    object,
                    root_flag,
                    rooted: is_rooted,
                });
            }
        }

        let live_ok = if self.exact {
            live_objects == report.reachable
        } else {
            live_objects >= report.reachable
        };
        if !live_ok {
            return Err(SanityError::LiveObjects {
                counter: live_objects,
                reachable: report.reachable,
            });
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::{BYTES_IN_PAGE, HEAP_START};
    use crate::util::test_util::mock_vm::{object, MockVM};

    fn setup() -> (HeapMemory, Vec<ObjectReference>) {
        let heap = HeapMemory::new(HEAP_START, BYTES_IN_PAGE);
        let objs = (0..4)
            .map(|i| {
                let o = ObjectReference::from_raw_address(HEAP_START + i * object::bytes_for(2, 0)).unwrap();
                object::write_shape(&heap, o, object::Shape::new(2, 0, 0));
                rc::initialize_header(&heap, o, false, false);
                o
            })
            .collect();
        (heap, objs)
    }

    fn link(heap: &HeapMemory, from: ObjectReference, i: usize, to: ObjectReference) {
        object::set_ref_raw(heap, from, i, Some(to));
        rc::inc(heap, to);
    }

    #[test]
    fn consistent_counts_pass() {
        let (heap, o) = setup();
        rc::set_root(&heap, o[0]);
        link(&heap, o[0], 0, o[1]);
        link(&heap, o[0], 1, o[2]);
        link(&heap, o[1], 0, o[2]);
        let is_rc = |_: ObjectReference| true;
        let checker = SanityChecker::<MockVM>::new(&heap, &is_rc, true);
        let report = checker.check(&[o[0]], &[], 3).unwrap();
        assert_eq!(report.reachable, 3);
        assert_eq!(report.edges, 3);
    }

    #[test]
    fn missing_increment_is_reported() {
        let (heap, o) = setup();
        rc::set_root(&heap, o[0]);
        link(&heap, o[0], 0, o[1]);
        object::set_ref_raw(&heap, o[1], 0, Some(o[2]));
        let is_rc = |_: ObjectReference| true;
        let checker = SanityChecker::<MockVM>::new(&heap, &is_rc, false);
        assert_eq!(
            checker.check(&[o[0]], &[], 3).unwrap_err(),
            SanityError::Count {
                object: o[2],
                rc: 0,
                traced: 1
            }
        );
    }

    #[test]
    fn garbage_counts_are_tolerated_unless_exact() {
        let (heap, o) = setup();
        rc::set_root(&heap, o[0]);
        link(&heap, o[0], 0, o[1]);
        // o[3] is unreachable but still references o[1].
        link(&heap, o[3], 0, o[1]);
        let is_rc = |_: ObjectReference| true;
        assert!(SanityChecker::<MockVM>::new(&heap, &is_rc, false).check(&[o[0]], &[], 3).is_ok());
        assert!(matches!(
            SanityChecker::<MockVM>::new(&heap, &is_rc, true).check(&[o[0]], &[], 3),
            Err(SanityError::Count { .. })
        ));
    }

    #[test]
    fn stale_root_flag_is_reported() {
        let (heap, o) = setup();
        rc::set_root(&heap, o[0]);
        link(&heap, o[0], 0, o[1]);
        rc::set_root(&heap, o[1]);
        let is_rc = |_: ObjectReference| true;
        let checker = SanityChecker::<MockVM>::new(&heap, &is_rc, true);
        assert!(matches!(
            checker.check(&[o[0]], &[], 2),
            Err(SanityError::Root { rooted: false, .. })
        ));
    }

    #[test]
    fn sources_contribute_edges() {
        let (heap, o) = setup();
        let is_rc = |obj: ObjectReference| obj != o[0];
        link(&heap, o[0], 0, o[1]);
        let checker = SanityChecker::<MockVM>::new(&heap, &is_rc, true);
        let report = checker.check(&[], &[o[0]], 1).unwrap();
        assert_eq!(report.reachable, 1);
    }
}

//! Trial deletion (Bacon and Rajan) over the purple buffer.
//!
//! A purple object lost a reference but is still counted, so it may be the
//! entry of a garbage cycle. Candidates are processed in three passes:
//!
//! 1. mark grey: subtract the counts contributed by every edge reachable
//!    from the candidates;
//! 2. scan: whatever is still counted is referenced from outside and is
//!    blackened again, restoring the counts on the way; the rest is white;
//! 3. collect white: free the white objects.
//!
//! Nothing is freed before the scan pass has seen every candidate.

use crate::util::deque::{LocalDeque, SharedDeque};
use crate::util::header::rc;
use crate::util::log;
use crate::util::memory::HeapMemory;
use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, VMBinding};
use std::marker::PhantomData;
use std::sync::Arc;

/// What the cycle detector needs from the plan that owns the counted objects.
pub trait CycleHost {
    fn heap(&self) -> &HeapMemory;
    /// Does the object carry a reference count?
    fn is_rc_object(&self, object: ObjectReference) -> bool;
    /// Release a dead object. Its children have been dealt with.
    fn free(&self, object: ObjectReference);
}

pub struct CycleDetector<VM: VMBinding> {
    purple: Arc<SharedDeque>,
    p: PhantomData<VM>,
}

impl<VM: VMBinding> CycleDetector<VM> {
    pub fn new(purple: Arc<SharedDeque>) -> Self {
        CycleDetector { purple, p: PhantomData }
    }

    pub fn purple(&self) -> &Arc<SharedDeque> {
        &self.purple
    }

    /// Record a candidate. The object must have just become purple and buffered.
    pub fn possible_cycle_root(purple: &mut LocalDeque, object: ObjectReference) {
        purple.push(object);
    }

    fn children<H: CycleHost>(host: &H, object: ObjectReference) -> Vec<ObjectReference> {
        let heap = host.heap();
        let mut children = vec![];
        VM::VMObjectModel::scan_object(heap, object, &mut |slot: Address| {
            if let Some(child) = heap.load_reference(slot) {
                if host.is_rc_object(child) {
                    children.push(child);
                }
            }
        });
        children
    }

    fn drain_candidates(&self) -> Vec<ObjectReference> {
        let mut local = LocalDeque::new(self.purple.clone());
        let mut candidates = vec![];
        while let Some(object) = local.try_pop() {
            candidates.push(object);
        }
        candidates
    }

    /// Process the purple buffer. Candidates are only traced when `force` is
    /// set or there are at least `threshold` of them; otherwise the dead ones
    /// are freed and the rest stay buffered. Green children of freed objects
    /// are pushed to `decs`, since their counts are real. Returns whether
    /// any object was freed.
    ///
    /// Runs on one thread while every other collector waits.
    pub fn collect_cycles<H: CycleHost>(&self, host: &H, decs: &mut LocalDeque, force: bool, threshold: usize) -> bool {
        let heap = host.heap();
        let candidates = self.drain_candidates();
        let collect = force || candidates.len() >= threshold.max(1);
        log::debug!(
            "Cycle detection: {} candidates, {}",
            candidates.len(),
            if collect { "collecting" } else { "filtering" }
        );

        if !collect {
            let mut kept = LocalDeque::new(self.purple.clone());
            let freed = candidates
                .into_iter()
                .filter(|&c| {
                    if rc::is_purple(heap, c) && rc::is_live_rc(heap, c) {
                        kept.push(c);
                        false
                    } else {
                        Self::release_candidate(host, c)
                    }
                })
                .count();
            return freed > 0;
        }

        let mut freed = 0;
        let mut roots = vec![];
        for c in candidates {
            if rc::is_purple(heap, c) && rc::is_live_rc(heap, c) {
                self.mark_grey(host, c);
                roots.push(c);
            } else if Self::release_candidate(host, c) {
                freed += 1;
            }
        }
        for &root in roots.iter() {
            self.scan(host, root);
        }
        if cfg!(feature = "extreme_assertions") {
            for &root in roots.iter() {
                assert!(!rc::is_grey(heap, root), "{} is still grey after scanning", root);
            }
        }
        for &root in roots.iter() {
            rc::clear_buffered(heap, root);
            freed += self.collect_white(host, root, decs);
        }
        log::debug!("Cycle detection freed {} objects from {} roots", freed, roots.len());
        freed > 0
    }

    /// Empty the purple buffer without looking for cycles. Candidates killed
    /// by decrements are freed. Returns whether any object was freed.
    pub fn release_candidates<H: CycleHost>(&self, host: &H) -> bool {
        let freed = self
            .drain_candidates()
            .into_iter()
            .filter(|&c| Self::release_candidate(host, c))
            .count();
        freed > 0
    }

    /// Drop a candidate that is no longer purple from the buffer. Frees it if
    /// a decrement already killed it. Returns whether it was freed.
    fn release_candidate<H: CycleHost>(host: &H, object: ObjectReference) -> bool {
        let heap = host.heap();
        rc::clear_buffered(heap, object);
        if rc::is_black(heap, object) && !rc::is_live_rc(heap, object) {
            host.free(object);
            true
        } else {
            false
        }
    }

    /// Subtract the count of every edge reachable from `root`.
    fn mark_grey<H: CycleHost>(&self, host: &H, root: ObjectReference) {
        let heap = host.heap();
        let mut stack = vec![root];
        while let Some(object) = stack.pop() {
            if rc::is_grey(heap, object) {
                continue;
            }
            rc::make_grey(heap, object);
            for child in Self::children(host, object) {
                if !rc::is_green(heap, child) {
                    rc::dec_unsync(heap, child);
                    stack.push(child);
                }
            }
        }
    }

    fn scan<H: CycleHost>(&self, host: &H, root: ObjectReference) {
        let heap = host.heap();
        let mut stack = vec![root];
        while let Some(object) = stack.pop() {
            if !rc::is_grey(heap, object) {
                continue;
            }
            if rc::is_live_rc(heap, object) {
                self.scan_black(host, object);
            } else {
                rc::make_white(heap, object);
                stack.extend(Self::children(host, object).into_iter().filter(|&c| !rc::is_green(heap, c)));
            }
        }
    }

    /// `object` is referenced from outside the candidates. Blacken it and
    /// everything it reaches, and give back the trial decrements.
    fn scan_black<H: CycleHost>(&self, host: &H, object: ObjectReference) {
        let heap = host.heap();
        rc::make_black(heap, object);
        let mut stack = vec![object];
        while let Some(object) = stack.pop() {
            for child in Self::children(host, object) {
                if rc::is_green(heap, child) {
                    continue;
                }
                rc::inc_unsync(heap, child);
                if !rc::is_black(heap, child) {
                    rc::make_black(heap, child);
                    stack.push(child);
                }
            }
        }
    }

    fn collect_white<H: CycleHost>(&self, host: &H, root: ObjectReference, decs: &mut LocalDeque) -> usize {
        let heap = host.heap();
        let mut freed = 0;
        let mut stack = vec![root];
        while let Some(object) = stack.pop() {
            if !rc::is_white(heap, object) || rc::is_buffered(heap, object) {
                continue;
            }
            rc::make_black(heap, object);
            for child in Self::children(host, object) {
                if rc::is_green(heap, child) {
                    decs.push(child);
                } else {
                    stack.push(child);
                }
            }
            host.free(object);
            freed += 1;
        }
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::{BYTES_IN_PAGE, HEAP_START};
    use crate::util::deque::MetaDataPool;
    use crate::util::header::rc::DecResult;
    use crate::util::test_util::mock_vm::{object, MockVM};
    use std::cell::RefCell;

    struct TestHost {
        heap: HeapMemory,
        next: RefCell<Address>,
        freed: RefCell<Vec<ObjectReference>>,
    }

    impl TestHost {
        fn new() -> Self {
            TestHost {
                heap: HeapMemory::new(HEAP_START, 16 * BYTES_IN_PAGE),
                next: RefCell::new(HEAP_START),
                freed: RefCell::new(vec![]),
            }
        }

        fn new_object(&self, refs: usize, acyclic: bool) -> ObjectReference {
            let bytes = object::bytes_for(refs, 0);
            let start = *self.next.borrow();
            *self.next.borrow_mut() = start + bytes;
            let obj = ObjectReference::from_raw_address(start).unwrap();
            let flags = if acyclic { object::ACYCLIC } else { 0 };
            object::write_shape(&self.heap, obj, object::Shape::new(refs, 0, flags));
            rc::initialize_header(&self.heap, obj, false, acyclic);
            obj
        }

        /// A counted reference from `from` to `to`.
        fn link(&self, from: ObjectReference, i: usize, to: ObjectReference) {
            object::set_ref_raw(&self.heap, from, i, Some(to));
            rc::inc(&self.heap, to);
        }

        fn was_freed(&self, o: ObjectReference) -> bool {
            self.freed.borrow().contains(&o)
        }
    }

    impl CycleHost for TestHost {
        fn heap(&self) -> &HeapMemory {
            &self.heap
        }

        fn is_rc_object(&self, object: ObjectReference) -> bool {
            self.heap.contains(object.to_raw_address())
        }

        fn free(&self, object: ObjectReference) {
            assert!(!self.was_freed(object), "{} freed twice", object);
            self.freed.borrow_mut().push(object);
        }
    }

    fn deques() -> (CycleDetector<MockVM>, LocalDeque, LocalDeque) {
        let pool = Arc::new(MetaDataPool::new());
        let purple = Arc::new(SharedDeque::new("purple", pool.clone()));
        let decs = Arc::new(SharedDeque::new("decs", pool));
        let detector = CycleDetector::new(purple.clone());
        (detector, LocalDeque::new(purple), LocalDeque::new(decs))
    }

    /// Drop one reference to `o`, the way decrement processing does.
    fn drop_reference(host: &TestHost, purple: &mut LocalDeque, o: ObjectReference) {
        if rc::dec(&host.heap, o) == DecResult::Buffer {
            CycleDetector::<MockVM>::possible_cycle_root(purple, o);
        }
    }

    fn ring(host: &TestHost, n: usize) -> Vec<ObjectReference> {
        let objs: Vec<_> = (0..n).map(|_| host.new_object(1, false)).collect();
        for i in 0..n {
            host.link(objs[i], 0, objs[(i + 1) % n]);
        }
        objs
    }

    #[test]
    fn garbage_ring_is_freed() {
        for n in [1, 2, 7, 100] {
            let host = TestHost::new();
            let (detector, mut purple, mut decs) = deques();
            let objs = ring(&host, n);
            // An external reference that goes away.
            rc::inc(&host.heap, objs[0]);
            drop_reference(&host, &mut purple, objs[0]);
            purple.flush();

            assert!(detector.collect_cycles(&host, &mut decs, true, 0));
            assert_eq!(host.freed.borrow().len(), n);
            for o in objs {
                assert!(host.was_freed(o));
            }
            assert!(decs.is_locally_empty());
        }
    }

    #[test]
    fn externally_referenced_ring_survives() {
        let host = TestHost::new();
        let (detector, mut purple, mut decs) = deques();
        let objs = ring(&host, 5);
        let holder = host.new_object(1, false);
        rc::set_root(&host.heap, holder);
        host.link(holder, 0, objs[3]);
        rc::inc(&host.heap, objs[0]);
        drop_reference(&host, &mut purple, objs[0]);
        purple.flush();

        assert!(!detector.collect_cycles(&host, &mut decs, true, 0));
        assert!(host.freed.borrow().is_empty());
        for (i, &o) in objs.iter().enumerate() {
            assert!(rc::is_black(&host.heap, o));
            assert!(!rc::is_buffered(&host.heap, o));
            let expected = if i == 3 { 2 } else { 1 };
            assert_eq!(rc::get_rc(&host.heap, o), expected);
        }
    }

    #[test]
    fn green_children_get_real_decrements() {
        let host = TestHost::new();
        let (detector, mut purple, mut decs) = deques();
        let a = host.new_object(2, false);
        let b = host.new_object(1, false);
        let leaf = host.new_object(0, true);
        host.link(a, 0, b);
        host.link(b, 0, a);
        host.link(a, 1, leaf);
        rc::inc(&host.heap, a);
        drop_reference(&host, &mut purple, a);
        purple.flush();

        assert!(detector.collect_cycles(&host, &mut decs, true, 0));
        assert!(host.was_freed(a) && host.was_freed(b));
        assert!(!host.was_freed(leaf));
        assert_eq!(rc::get_rc(&host.heap, leaf), 1);
        assert_eq!(decs.try_pop(), Some(leaf));
    }

    #[test]
    fn below_threshold_keeps_candidates() {
        let host = TestHost::new();
        let (detector, mut purple, mut decs) = deques();
        let objs = ring(&host, 2);
        rc::inc(&host.heap, objs[0]);
        drop_reference(&host, &mut purple, objs[0]);
        purple.flush();

        assert!(!detector.collect_cycles(&host, &mut decs, false, 10));
        assert!(host.freed.borrow().is_empty());
        assert!(rc::is_buffered(&host.heap, objs[0]));
        assert_eq!(detector.purple().entries(), 1);

        assert!(detector.collect_cycles(&host, &mut decs, false, 1));
        assert_eq!(host.freed.borrow().len(), 2);
    }

    #[test]
    fn killed_candidate_is_freed_by_filter() {
        let host = TestHost::new();
        let (detector, mut purple, mut decs) = deques();
        let o = host.new_object(0, false);
        rc::inc(&host.heap, o);
        rc::inc(&host.heap, o);
        drop_reference(&host, &mut purple, o);
        purple.flush();
        // The last reference goes away: decrement processing kills it but
        // leaves the freeing to the buffer owner.
        assert_eq!(rc::dec(&host.heap, o), DecResult::Kill);
        rc::make_black(&host.heap, o);

        assert!(detector.collect_cycles(&host, &mut decs, false, 100));
        assert!(host.was_freed(o));
    }

    #[test]
    fn releasing_candidates_leaves_cycles_alone() {
        let host = TestHost::new();
        let (detector, mut purple, _decs) = deques();
        let objs = ring(&host, 2);
        rc::inc(&host.heap, objs[0]);
        drop_reference(&host, &mut purple, objs[0]);
        purple.flush();

        assert!(!detector.release_candidates(&host));
        assert!(host.freed.borrow().is_empty());
        assert!(!rc::is_buffered(&host.heap, objs[0]));
        assert!(detector.purple().is_empty());
    }
}

use crate::plan::ObjectQueue;
use crate::policy::space::{CommonSpace, PlanCreateSpaceArgs, Space, SFT};
use crate::util::conversions;
use crate::util::header::status::{self, MARK_BIT};
use crate::util::heap::{FreeListPageResource, PageResource};
use crate::util::log;
use crate::util::opaque_pointer::VMThread;
use crate::util::treadmill::TreadMill;
use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Each object gets its own run of pages. Objects are found by a treadmill
/// rather than by scanning the pages. Tracing plans mark them and sweep the
/// treadmill at full-heap GCs. Reference counting plans free them explicitly.
pub struct LargeObjectSpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: FreeListPageResource,
    mark_state: AtomicUsize,
    in_nursery_gc: AtomicBool,
    treadmill: TreadMill,
}

impl<VM: VMBinding> SFT for LargeObjectSpace<VM> {
    fn name(&self) -> &'static str {
        self.get_name()
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        self.treadmill.contains(object) && status::is_marked(&self.common.heap, object, self.mark_state())
    }

    fn is_movable(&self) -> bool {
        false
    }

    fn initialize_object_metadata(&self, object: ObjectReference, _alloc: bool) {
        status::write_mark_state(&self.common.heap, object, self.mark_state());
        self.treadmill.add_to_treadmill(object);
    }
}

impl<VM: VMBinding> Space<VM> for LargeObjectSpace<VM> {
    fn as_space(&self) -> &dyn Space<VM> {
        self
    }

    fn get_page_resource(&self) -> &dyn PageResource {
        &self.pr
    }

    fn common(&self) -> &CommonSpace<VM> {
        &self.common
    }
}

impl<VM: VMBinding> LargeObjectSpace<VM> {
    pub fn new(args: PlanCreateSpaceArgs<VM>) -> Self {
        let pr = FreeListPageResource::new(args.heap.clone(), args.meta.start, args.meta.extent);
        LargeObjectSpace {
            common: CommonSpace::new(args),
            pr,
            mark_state: AtomicUsize::new(0),
            in_nursery_gc: AtomicBool::new(false),
            treadmill: TreadMill::new(),
        }
    }

    fn mark_state(&self) -> usize {
        self.mark_state.load(Ordering::Relaxed)
    }

    pub fn prepare(&self, full_heap: bool) {
        if full_heap {
            debug_assert!(self.treadmill.from_space_empty());
            let flipped = MARK_BIT.max_value() - self.mark_state();
            self.mark_state.store(flipped, Ordering::Relaxed);
            self.treadmill.flip();
        }
        self.in_nursery_gc.store(!full_heap, Ordering::Relaxed);
    }

    pub fn release(&self, full_heap: bool) {
        if full_heap {
            let dead = self.treadmill.collect();
            let mut pages = 0;
            for object in dead.iter() {
                pages += self.pr.release_pages(conversions::page_align_down(object.to_object_start()));
            }
            log::debug!("{}: swept {} objects, {} pages", self.get_name(), dead.len(), pages);
        }
    }

    pub fn trace_object<Q: ObjectQueue>(&self, queue: &mut Q, object: ObjectReference) -> ObjectReference {
        if self.in_nursery_gc.load(Ordering::Relaxed) {
            return object;
        }
        if status::test_and_mark(&self.common.heap, object, self.mark_state()) {
            self.treadmill.copy(object);
            queue.enqueue(object);
        }
        object
    }

    /// Give the pages of a dead object back. Returns the number of pages freed.
    pub fn free(&self, object: ObjectReference) -> usize {
        let removed = self.treadmill.remove(object);
        debug_assert!(removed, "{} is not a live large object", object);
        self.pr.release_pages(conversions::page_align_down(object.to_object_start()))
    }

    pub fn allocate_pages(&self, tls: VMThread, pages: usize) -> Address {
        self.acquire(tls, pages)
    }

    /// Every large object, reached or not.
    pub fn objects(&self) -> Vec<ObjectReference> {
        self.treadmill.objects()
    }
}

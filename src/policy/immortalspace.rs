use crate::plan::ObjectQueue;
use crate::policy::space::{CommonSpace, PlanCreateSpaceArgs, Space, SFT};
use crate::util::header::status::{self, MARK_BIT};
use crate::util::heap::{MonotonePageResource, PageResource};
use crate::util::ObjectReference;
use crate::vm::VMBinding;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// This type implements a simple immortal collection policy. Under this
/// policy all that is required is for the "collector" to propagate marks
/// in a liveness trace. It does not actually collect.
pub struct ImmortalSpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: MonotonePageResource,
    mark_state: AtomicUsize,
    /// Every object ever allocated here. Reference counting plans trace
    /// from them when checking counts.
    objects: Mutex<Vec<ObjectReference>>,
}

impl<VM: VMBinding> SFT for ImmortalSpace<VM> {
    fn name(&self) -> &'static str {
        self.get_name()
    }

    fn is_live(&self, _object: ObjectReference) -> bool {
        true
    }

    fn is_movable(&self) -> bool {
        false
    }

    fn initialize_object_metadata(&self, object: ObjectReference, _alloc: bool) {
        status::write_mark_state(&self.common.heap, object, self.mark_state());
        self.objects.lock().unwrap().push(object);
    }
}

impl<VM: VMBinding> Space<VM> for ImmortalSpace<VM> {
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

impl<VM: VMBinding> ImmortalSpace<VM> {
    pub fn new(args: PlanCreateSpaceArgs<VM>) -> Self {
        let pr = MonotonePageResource::new(args.heap.clone(), args.meta.start, args.meta.extent);
        ImmortalSpace {
            common: CommonSpace::new(args),
            pr,
            mark_state: AtomicUsize::new(0),
            objects: Mutex::new(vec![]),
        }
    }

    fn mark_state(&self) -> usize {
        self.mark_state.load(Ordering::Relaxed)
    }

    /// Flip the mark polarity, so every object starts the trace unmarked.
    pub fn prepare(&self) {
        let flipped = MARK_BIT.max_value() - self.mark_state();
        self.mark_state.store(flipped, Ordering::Relaxed);
    }

    pub fn release(&self) {}

    pub fn trace_object<Q: ObjectQueue>(&self, queue: &mut Q, object: ObjectReference) -> ObjectReference {
        if status::test_and_mark(&self.common.heap, object, self.mark_state()) {
            queue.enqueue(object);
        }
        object
    }

    /// A snapshot of every object in the space.
    pub fn objects(&self) -> Vec<ObjectReference> {
        self.objects.lock().unwrap().clone()
    }
}

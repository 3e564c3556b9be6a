use crate::plan::ObjectQueue;
use crate::policy::space::{CommonSpace, PlanCreateSpaceArgs, Space, SFT};
use crate::util::copy::GCWorkerCopyContext;
use crate::util::heap::{MonotonePageResource, PageResource};
use crate::util::header::status::NOT_FORWARDED;
use crate::util::log;
use crate::util::object_forwarding;
use crate::util::ObjectReference;
use crate::vm::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// A bump-allocated space whose live objects are evacuated as a whole. Used
/// for the nursery and for the two mature semispaces.
pub struct CopySpace<VM: VMBinding> {
    common: CommonSpace<VM>,
    pr: MonotonePageResource,
    from_space: AtomicBool,
}

impl<VM: VMBinding> SFT for CopySpace<VM> {
    fn name(&self) -> &'static str {
        self.get_name()
    }

    fn get_forwarded_object(&self, object: ObjectReference) -> Option<ObjectReference> {
        if !self.is_from_space() {
            return None;
        }
        let heap = &self.common.heap;
        if object_forwarding::is_forwarded(heap, object) {
            Some(object_forwarding::read_forwarding_pointer(heap, object))
        } else {
            None
        }
    }

    fn is_live(&self, object: ObjectReference) -> bool {
        if self.is_from_space() {
            object_forwarding::is_forwarded(&self.common.heap, object)
        } else {
            // Released pages are behind the cursor, so stale references are dead.
            object.to_raw_address() < self.pr.cursor()
        }
    }

    fn is_movable(&self) -> bool {
        true
    }

    fn initialize_object_metadata(&self, _object: ObjectReference, _alloc: bool) {}
}

impl<VM: VMBinding> Space<VM> for CopySpace<VM> {
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

impl<VM: VMBinding> CopySpace<VM> {
    pub fn new(args: PlanCreateSpaceArgs<VM>, from_space: bool) -> Self {
        let pr = MonotonePageResource::new(args.heap.clone(), args.meta.start, args.meta.extent);
        CopySpace {
            common: CommonSpace::new(args),
            pr,
            from_space: AtomicBool::new(from_space),
        }
    }

    pub fn prepare(&self, from_space: bool) {
        self.from_space.store(from_space, Ordering::SeqCst);
    }

    /// Every object left here is dead or has been evacuated, so the whole
    /// extent is reusable.
    pub fn release(&self) {
        log::debug!("{}: releasing {} pages", self.get_name(), self.reserved_pages());
        self.pr.reset();
        self.from_space.store(false, Ordering::SeqCst);
    }

    pub fn is_from_space(&self) -> bool {
        self.from_space.load(Ordering::SeqCst)
    }

    pub fn trace_object<Q: ObjectQueue>(
        &self,
        queue: &mut Q,
        object: ObjectReference,
        copy_context: &mut GCWorkerCopyContext<VM>,
    ) -> ObjectReference {
        log::trace!("copyspace.trace_object({}) in {}", object, self.get_name());
        if !self.is_from_space() {
            return object;
        }
        let heap = &self.common.heap;
        let forwarding_status = object_forwarding::attempt_to_forward(heap, object);
        if forwarding_status != NOT_FORWARDED {
            return object_forwarding::spin_and_get_forwarded_object(heap, object, forwarding_status);
        }

        let bytes = VM::VMObjectModel::get_current_size(heap, object);
        let align = VM::VMObjectModel::get_align_when_copied(heap, object);
        let to = copy_context.alloc_copy(object, bytes, align, 0);
        let new_object = object_forwarding::copy_object(heap, object, bytes, to);
        // The copy must be set up before any other thread can see it.
        copy_context.post_copy(new_object, bytes);
        object_forwarding::write_forwarding_pointer(heap, object, new_object);
        log::trace!("Copied [{} -> {}] {} bytes", object, new_object, bytes);
        queue.enqueue(new_object);
        new_object
    }
}

use crate::plan::global::CommonPlan;
use crate::plan::{CreateSpecificPlanArgs, ObjectQueue, Plan};
use crate::policy::copyspace::CopySpace;
use crate::policy::space::Space;
use crate::util::copy::GCWorkerCopyContext;
use crate::util::deque::SharedDeque;
use crate::util::log;
use crate::util::opaque_pointer::VMWorkerThread;
use crate::util::ObjectReference;
use crate::vm::VMBinding;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Common implementation for generational plans. Each generational plan
/// should include this type, and forward calls to it where possible.
pub struct Gen<VM: VMBinding> {
    /// The nursery space.
    pub nursery: CopySpace<VM>,
    /// The common plan.
    pub common: CommonPlan<VM>,
    /// Is this GC full heap?
    pub gc_full_heap: AtomicBool,
    /// Is next GC full heap?
    pub next_gc_full_heap: AtomicBool,
    /// Mature objects modified since the last GC.
    pub modbuf: Arc<SharedDeque>,
}

impl<VM: VMBinding> Gen<VM> {
    pub fn new(args: &CreateSpecificPlanArgs<VM>) -> Self {
        let common = CommonPlan::new(args);
        let modbuf = Arc::new(SharedDeque::new("modbuf", common.base.meta_pool.clone()));
        Gen {
            nursery: CopySpace::new(args.get_space_args(super::NURSERY), false),
            common,
            gc_full_heap: AtomicBool::default(),
            next_gc_full_heap: AtomicBool::new(false),
            modbuf,
        }
    }

    /// Get spaces in generation plans
    pub fn get_spaces(&self) -> Vec<&dyn Space<VM>> {
        let mut ret = self.common.get_spaces();
        ret.push(&self.nursery);
        ret
    }

    /// The pages the nursery may grow to before a nursery GC is triggered.
    pub fn nursery_budget(&self) -> usize {
        let options = &self.common.base.options;
        let total = self.common.base.gc_trigger.get_heap_size_in_pages();
        ((total as f64 * options.nursery_fraction) as usize).max(1)
    }

    /// Prepare Gen. This should be called by a single thread in GC prepare work.
    pub fn prepare(&self, tls: VMWorkerThread) {
        let full_heap = !self.is_current_gc_nursery();
        self.common.prepare(tls, full_heap);
        self.nursery.prepare(true);
    }

    /// Release Gen. This should be called by a single thread in GC release work.
    pub fn release(&self, tls: VMWorkerThread) {
        let full_heap = !self.is_current_gc_nursery();
        self.common.release(tls, full_heap);
        self.nursery.release();
    }

    /// Check if we need a GC based on the nursery space usage. This method may mark
    /// the following GC as a full heap GC.
    pub fn collection_required<P: Plan>(&self, plan: &P, space_full: bool, space: Option<&dyn Space<VM>>) -> bool {
        let nursery_full = self.nursery.reserved_pages() >= self.nursery_budget();
        if nursery_full {
            return true;
        }

        let is_triggered_by_nursery = space.is_some_and(|s| s.get_name() == self.nursery.get_name());
        // If a mature space is full, only a full heap GC can help.
        if space_full && !is_triggered_by_nursery {
            self.next_gc_full_heap.store(true, Ordering::SeqCst);
        }

        self.common.base.collection_required(plan, space_full)
    }

    pub fn force_full_heap_collection(&self) {
        self.next_gc_full_heap.store(true, Ordering::Relaxed);
    }

    pub fn is_current_gc_nursery(&self) -> bool {
        !self.gc_full_heap.load(Ordering::SeqCst)
    }

    /// Check if we should do a full heap GC. It returns true if we should have a full heap GC.
    /// It also sets gc_full_heap based on the result.
    pub fn request_full_heap_collection(&self, total_pages: usize, reserved_pages: usize) -> bool {
        let base = &self.common.base;
        // The conditions are easier to read as separate blocks.
        #[allow(clippy::if_same_then_else)]
        let is_full_heap = if base.state.is_user_triggered_collection() && base.options.full_heap_system_gc {
            true
        } else if self.next_gc_full_heap.load(Ordering::SeqCst) || base.state.collection_attempts() > 1 {
            true
        } else {
            total_pages <= reserved_pages
        };

        self.gc_full_heap.store(is_full_heap, Ordering::SeqCst);
        log::info!("{}", if is_full_heap { "Full heap GC" } else { "Nursery GC" });
        is_full_heap
    }

    /// Decide whether the next GC must be a full heap GC: the mature
    /// spaces should still have room for a full nursery to be promoted.
    pub fn set_next_gc_full_heap(&self, available_pages: usize) {
        let next = available_pages < self.nursery_budget();
        log::debug!("{} pages available. Next GC full heap: {}", available_pages, next);
        self.next_gc_full_heap.store(next, Ordering::SeqCst);
    }

    /// Trace the spaces shared with the rest of the generational plans.
    /// Nursery objects are promoted through `copy`. In a nursery GC, mature
    /// objects are not traced.
    pub fn trace_object_nursery<Q: ObjectQueue>(
        &self,
        queue: &mut Q,
        object: ObjectReference,
        copy: &mut GCWorkerCopyContext<VM>,
    ) -> ObjectReference {
        if self.nursery.in_space(object) {
            return self.nursery.trace_object(queue, object, copy);
        }
        object
    }

    /// Full heap counterpart of [`Gen::trace_object_nursery`]. Objects in
    /// plan-specific spaces must have been handled by the caller.
    pub fn trace_object_full_heap<Q: ObjectQueue>(
        &self,
        queue: &mut Q,
        object: ObjectReference,
        copy: &mut GCWorkerCopyContext<VM>,
    ) -> ObjectReference {
        if self.nursery.in_space(object) {
            return self.nursery.trace_object(queue, object, copy);
        }
        self.common.trace_object(queue, object)
    }

    pub fn get_used_pages(&self) -> usize {
        self.nursery.reserved_pages() + self.common.get_used_pages()
    }
}

use crate::plan::Plan;
use crate::policy::space::Space;
use crate::util::alloc::{AllocatorSelector, Allocators, BumpAllocator};
use crate::util::log;
use crate::util::opaque_pointer::VMWorkerThread;
use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;

/// Where a plan copies objects to. Similar to a `MutatorConfig`, each
/// copying plan provides one.
pub struct CopyConfig<VM: VMBinding> {
    /// The copy allocator and the space it allocates from. `None` for
    /// plans that never move objects.
    pub copy_mapping: Option<(AllocatorSelector, &'static dyn Space<VM>)>,
}

impl<VM: VMBinding> Default for CopyConfig<VM> {
    fn default() -> Self {
        CopyConfig { copy_mapping: None }
    }
}

/// The thread local struct for each collector thread for copying.
pub struct GCWorkerCopyContext<VM: VMBinding> {
    allocators: Allocators<VM>,
    selector: AllocatorSelector,
    plan: &'static dyn Plan<VM = VM>,
    /// Bytes copied in the current GC.
    copied_bytes: usize,
}

impl<VM: VMBinding> GCWorkerCopyContext<VM> {
    pub fn new(tls: VMWorkerThread, plan: &'static dyn Plan<VM = VM>, config: CopyConfig<VM>) -> Self {
        let mapping: Vec<_> = config.copy_mapping.into_iter().collect();
        GCWorkerCopyContext {
            allocators: Allocators::new(tls.0, &mapping),
            selector: config.copy_mapping.map_or(AllocatorSelector::None, |(s, _)| s),
            plan,
            copied_bytes: 0,
        }
    }

    /// Allocate for the object for GC copying. Running out of room while
    /// copying is fatal.
    ///
    /// Arguments:
    /// * `original`: The original object that will be copied.
    /// * `bytes`: The size in bytes for the allocation.
    /// * `align`: The alignment in bytes for the allocation.
    /// * `offset`: The offset in bytes for the allocation.
    pub fn alloc_copy(&mut self, original: ObjectReference, bytes: usize, align: usize, offset: usize) -> Address {
        let allocator = self.allocators.get_allocator_mut(self.selector);
        let result = allocator.alloc(bytes, align, offset);
        if result.is_zero() {
            panic!(
                "Failed to allocate {} bytes in {} to copy {}",
                bytes,
                allocator.get_space().get_name(),
                original
            );
        }
        self.copied_bytes += bytes;
        result
    }

    /// Set up the metadata of a fresh copy.
    pub fn post_copy(&mut self, object: ObjectReference, bytes: usize) {
        self.allocators
            .get_allocator(self.selector)
            .get_space()
            .initialize_object_metadata(object, false);
        self.plan.post_copy(object, bytes);
    }

    /// Copy into `space` from now on. Used when semispaces flip.
    pub fn rebind(&mut self, space: &'static dyn Space<VM>) {
        if let AllocatorSelector::BumpPointer(_) = self.selector {
            self.allocators
                .get_typed_allocator_mut::<BumpAllocator<VM>>(self.selector)
                .rebind(space);
        }
    }

    pub fn prepare(&mut self) {
        self.copied_bytes = 0;
    }

    /// Give back the copy buffers, so the target space sees every copy.
    pub fn release(&mut self) {
        if self.copied_bytes > 0 {
            log::trace!("Copied {} bytes", self.copied_bytes);
        }
        self.allocators.flush_all();
    }

    pub fn copied_bytes(&self) -> usize {
        self.copied_bytes
    }
}

use crate::global_state::GlobalState;
use crate::util::conversions;
use crate::util::heap::gc_trigger::GCTrigger;
use crate::util::heap::{PageResource, SpaceMeta};
use crate::util::log;
use crate::util::memory::HeapMemory;
use crate::util::options::Options;
use crate::util::opaque_pointer::VMThread;
use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;

use downcast_rs::Downcast;
use std::marker::PhantomData;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Per-object semantics that depend on the space an object lives in rather
/// than on its type.
pub trait SFT {
    /// The space name
    fn name(&self) -> &'static str;

    /// Get forwarding pointer if the object is forwarded.
    fn get_forwarded_object(&self, _object: ObjectReference) -> Option<ObjectReference> {
        None
    }

    /// Is the object live, determined by the policy?
    fn is_live(&self, object: ObjectReference) -> bool;

    /// Is the object movable, determined by the policy?
    fn is_movable(&self) -> bool;

    /// Initialize the GC state of a new object. `alloc` is false when the
    /// object is a copy made by the GC.
    fn initialize_object_metadata(&self, object: ObjectReference, alloc: bool);
}

/// A space is a contiguous extent of the heap managed by one policy.
pub trait Space<VM: VMBinding>: 'static + SFT + Sync + Downcast {
    fn as_space(&self) -> &dyn Space<VM>;
    fn get_page_resource(&self) -> &dyn PageResource;
    fn common(&self) -> &CommonSpace<VM>;

    /// Acquire `pages` zeroed pages. Before a GC is allowed (the collector
    /// is initialized and no GC is running), this polls the GC trigger, and
    /// returns zero if a GC was requested so that the caller can block for it.
    /// During a GC the pages are taken without polling.
    fn acquire(&self, tls: VMThread, pages: usize) -> Address {
        let common = self.common();
        let allow_gc = common.state.is_initialized() && !common.state.is_gc_in_progress();

        // No GC can make room for this. The allocation slow path reports it.
        if pages > common.gc_trigger.get_heap_size_in_pages() {
            log::warn!("{}: {} pages requested, more than the heap", self.get_name(), pages);
            return Address::ZERO;
        }

        log::trace!("Reserving {} pages in {}", pages, self.get_name());
        let pr = self.get_page_resource();
        let pages_reserved = pr.reserve_pages(pages);

        if allow_gc && common.gc_trigger.poll(false, Some(self.as_space())) {
            log::debug!("Collection required");
            pr.clear_request(pages_reserved);
            common.state.pending_request_pages.store(pages, Ordering::Relaxed);
            return Address::ZERO;
        }

        match pr.get_new_pages(pages_reserved, pages) {
            Ok(res) => {
                log::debug!("{}: acquired {} pages at {} for {:?}", self.get_name(), res.pages, res.start, tls);
                res.start
            }
            Err(_) => {
                // We thought we had memory to allocate, but the extent is used up. Force a GC.
                pr.clear_request(pages_reserved);
                if allow_gc {
                    let gc_performed = common.gc_trigger.poll(true, Some(self.as_space()));
                    debug_assert!(gc_performed, "GC not performed when the space is full");
                    common.state.pending_request_pages.store(pages, Ordering::Relaxed);
                } else {
                    log::warn!("{}: {} pages requested while no GC can run", self.get_name(), pages);
                }
                Address::ZERO
            }
        }
    }

    fn address_in_space(&self, start: Address) -> bool {
        let common = self.common();
        start >= common.start && start < common.start + common.extent
    }

    fn in_space(&self, object: ObjectReference) -> bool {
        self.address_in_space(object.to_raw_address())
    }

    fn get_name(&self) -> &'static str {
        self.common().name
    }

    fn reserved_pages(&self) -> usize {
        self.get_page_resource().reserved_pages()
    }

    /// The pages this space can still hand out.
    fn available_physical_pages(&self) -> usize {
        self.get_page_resource().get_available_physical_pages()
    }

    fn print_vm_map(&self) -> String {
        let common = self.common();
        format!(
            "{:<12} {} ~ {} reserved {} pages ({})",
            common.name,
            common.start,
            common.start + common.extent,
            self.reserved_pages(),
            conversions::bytes_to_formatted_string(conversions::pages_to_bytes(self.reserved_pages())),
        )
    }
}

impl_downcast!(Space<VM> where VM: VMBinding);

/// Fields every space has.
pub struct CommonSpace<VM: VMBinding> {
    pub name: &'static str,
    pub start: Address,
    pub extent: usize,
    pub heap: Arc<HeapMemory>,
    pub gc_trigger: Arc<GCTrigger<VM>>,
    pub state: Arc<GlobalState>,
    pub options: Arc<Options>,
    p: PhantomData<VM>,
}

/// Arguments passed from a plan to create a space.
pub struct PlanCreateSpaceArgs<'a, VM: VMBinding> {
    pub meta: SpaceMeta,
    pub heap: &'a Arc<HeapMemory>,
    pub gc_trigger: &'a Arc<GCTrigger<VM>>,
    pub state: &'a Arc<GlobalState>,
    pub options: &'a Arc<Options>,
}

impl<VM: VMBinding> CommonSpace<VM> {
    pub fn new(args: PlanCreateSpaceArgs<VM>) -> Self {
        log::debug!("Created space {} [{}, {})", args.meta.name, args.meta.start, args.meta.start + args.meta.extent);
        CommonSpace {
            name: args.meta.name,
            start: args.meta.start,
            extent: args.meta.extent,
            heap: args.heap.clone(),
            gc_trigger: args.gc_trigger.clone(),
            state: args.state.clone(),
            options: args.options.clone(),
            p: PhantomData,
        }
    }
}

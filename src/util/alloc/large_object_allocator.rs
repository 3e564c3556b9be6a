use crate::policy::largeobjectspace::LargeObjectSpace;
use crate::policy::space::Space;
use crate::util::alloc::{allocator, Allocator};
use crate::util::conversions::bytes_to_pages_up;
use crate::util::opaque_pointer::VMThread;
use crate::util::Address;
use crate::vm::VMBinding;

/// Every allocation takes its own run of pages from the large object space.
pub struct LargeObjectAllocator<VM: VMBinding> {
    /// [`VMThread`] associated with this allocator instance
    pub tls: VMThread,
    space: &'static LargeObjectSpace<VM>,
}

impl<VM: VMBinding> LargeObjectAllocator<VM> {
    pub fn new(tls: VMThread, space: &'static LargeObjectSpace<VM>) -> Self {
        LargeObjectAllocator { tls, space }
    }
}

impl<VM: VMBinding> Allocator<VM> for LargeObjectAllocator<VM> {
    fn get_tls(&self) -> VMThread {
        self.tls
    }

    fn get_space(&self) -> &'static dyn Space<VM> {
        self.space as &'static dyn Space<VM>
    }

    fn alloc(&mut self, size: usize, align: usize, offset: usize) -> Address {
        self.alloc_slow_once(size, align, offset)
    }

    fn alloc_slow_once(&mut self, size: usize, align: usize, offset: usize) -> Address {
        let maxbytes = allocator::get_maximum_aligned_size::<VM>(size, align);
        let pages = bytes_to_pages_up(maxbytes);
        let sp = self.space.allocate_pages(self.tls, pages);
        if sp.is_zero() {
            sp
        } else {
            allocator::align_allocation::<VM>(sp, align, offset)
        }
    }
}

use crate::policy::space::Space;
use crate::util::opaque_pointer::VMThread;
use crate::util::Address;
use crate::vm::VMBinding;

use downcast_rs::Downcast;

/// The error handed to [`crate::vm::Collection::out_of_memory`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// The heap is exhausted even after collecting (and clearing soft references).
    HeapOutOfMemory,
}

/// Align `region` so that `(result + offset) % alignment == 0`.
#[inline(always)]
pub fn align_allocation<VM: VMBinding>(region: Address, alignment: usize, offset: usize) -> Address {
    debug_assert!(alignment >= VM::MIN_ALIGNMENT && alignment <= VM::MAX_ALIGNMENT);
    debug_assert!(alignment.is_power_of_two());
    debug_assert!(region.is_aligned_to(VM::MIN_ALIGNMENT));
    debug_assert!(offset % VM::MIN_ALIGNMENT == 0);

    let mask = (alignment - 1) as isize;
    let neg_off = -(offset as isize);
    let delta = (neg_off - region.as_usize() as isize) & mask;

    region + delta
}

/// The most bytes an allocation of `size` may need once alignment padding is added.
#[inline(always)]
pub fn get_maximum_aligned_size<VM: VMBinding>(size: usize, alignment: usize) -> usize {
    if alignment <= VM::MIN_ALIGNMENT {
        size
    } else {
        size + alignment - VM::MIN_ALIGNMENT
    }
}

/// A thread-local allocator bound to one space. `alloc` is the fast path;
/// it falls back to `alloc_slow_once` when the local buffer is used up.
/// Both return [`Address::ZERO`] when the space cannot provide memory without
/// a GC. Retrying after a GC is up to the caller.
pub trait Allocator<VM: VMBinding>: Downcast {
    /// The thread this allocator belongs to.
    fn get_tls(&self) -> VMThread;

    fn get_space(&self) -> &'static dyn Space<VM>;

    /// Allocate `size` zeroed bytes so that `(result + offset) % align == 0`.
    fn alloc(&mut self, size: usize, align: usize, offset: usize) -> Address;

    /// Refill the thread-local buffer from the space and allocate from it.
    fn alloc_slow_once(&mut self, size: usize, align: usize, offset: usize) -> Address;

    /// Give up thread-local buffers, so the space sees every allocated cell
    /// before a GC.
    fn flush(&mut self) {}
}

impl_downcast!(Allocator<VM> where VM: VMBinding);

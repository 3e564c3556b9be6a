use crate::policy::largeobjectspace::LargeObjectSpace;
use crate::policy::marksweepspace::{FreeListSpace, MarkSweepSpace};
use crate::policy::refcount::RefCountSpace;
use crate::policy::space::Space;
use crate::util::alloc::{Allocator, BumpAllocator, FreeListAllocator, LargeObjectAllocator};
use crate::util::opaque_pointer::VMThread;
use crate::vm::VMBinding;

pub(crate) const MAX_BUMP_ALLOCATORS: usize = 3;
pub(crate) const MAX_LARGE_OBJECT_ALLOCATORS: usize = 1;
pub(crate) const MAX_FREE_LIST_ALLOCATORS: usize = 1;

/// The allocators owned by one mutator or collector. There is a fixed number
/// of allocators of each kind, and each plan uses some of them.
pub struct Allocators<VM: VMBinding> {
    pub bump_pointer: [Option<BumpAllocator<VM>>; MAX_BUMP_ALLOCATORS],
    pub large_object: [Option<LargeObjectAllocator<VM>>; MAX_LARGE_OBJECT_ALLOCATORS],
    pub free_list: [Option<FreeListAllocator<VM>>; MAX_FREE_LIST_ALLOCATORS],
}

fn uninitialized(selector: AllocatorSelector) -> ! {
    panic!("Allocator {:?} is not initialized", selector)
}

impl<VM: VMBinding> Allocators<VM> {
    pub fn get_allocator(&self, selector: AllocatorSelector) -> &dyn Allocator<VM> {
        let allocator: Option<&dyn Allocator<VM>> = match selector {
            AllocatorSelector::BumpPointer(index) => {
                self.bump_pointer[index as usize].as_ref().map(|a| a as &dyn Allocator<VM>)
            }
            AllocatorSelector::LargeObject(index) => {
                self.large_object[index as usize].as_ref().map(|a| a as &dyn Allocator<VM>)
            }
            AllocatorSelector::FreeList(index) => self.free_list[index as usize].as_ref().map(|a| a as &dyn Allocator<VM>),
            AllocatorSelector::None => None,
        };
        allocator.unwrap_or_else(|| uninitialized(selector))
    }

    pub fn get_allocator_mut(&mut self, selector: AllocatorSelector) -> &mut dyn Allocator<VM> {
        let allocator: Option<&mut dyn Allocator<VM>> = match selector {
            AllocatorSelector::BumpPointer(index) => {
                self.bump_pointer[index as usize].as_mut().map(|a| a as &mut dyn Allocator<VM>)
            }
            AllocatorSelector::LargeObject(index) => {
                self.large_object[index as usize].as_mut().map(|a| a as &mut dyn Allocator<VM>)
            }
            AllocatorSelector::FreeList(index) => self.free_list[index as usize].as_mut().map(|a| a as &mut dyn Allocator<VM>),
            AllocatorSelector::None => None,
        };
        allocator.unwrap_or_else(|| uninitialized(selector))
    }

    /// Get the allocator of `selector` as its concrete type.
    pub fn get_typed_allocator_mut<T: Allocator<VM>>(&mut self, selector: AllocatorSelector) -> &mut T {
        self.get_allocator_mut(selector)
            .downcast_mut::<T>()
            .unwrap_or_else(|| panic!("Allocator {:?} has an unexpected type", selector))
    }

    pub fn new(tls: VMThread, space_mapping: &[(AllocatorSelector, &'static dyn Space<VM>)]) -> Self {
        let mut ret = Allocators {
            bump_pointer: std::array::from_fn(|_| None),
            large_object: std::array::from_fn(|_| None),
            free_list: std::array::from_fn(|_| None),
        };

        for &(selector, space) in space_mapping.iter() {
            match selector {
                AllocatorSelector::BumpPointer(index) => {
                    ret.bump_pointer[index as usize] = Some(BumpAllocator::new(tls, space));
                }
                AllocatorSelector::LargeObject(index) => {
                    let los = space
                        .downcast_ref::<LargeObjectSpace<VM>>()
                        .unwrap_or_else(|| panic!("{} is not a large object space", space.get_name()));
                    ret.large_object[index as usize] = Some(LargeObjectAllocator::new(tls, los));
                }
                AllocatorSelector::FreeList(index) => {
                    let fls: &'static dyn FreeListSpace<VM> = if let Some(ms) = space.downcast_ref::<MarkSweepSpace<VM>>() {
                        ms
                    } else if let Some(rc) = space.downcast_ref::<RefCountSpace<VM>>() {
                        rc
                    } else {
                        panic!("{} is not a free list space", space.get_name())
                    };
                    ret.free_list[index as usize] = Some(FreeListAllocator::new(tls, fls));
                }
                AllocatorSelector::None => panic!("Allocator mapping is not initialized"),
            }
        }

        ret
    }

    /// Flush every allocator. Called before a GC looks at the spaces.
    pub fn flush_all(&mut self) {
        self.bump_pointer.iter_mut().flatten().for_each(|a| a.flush());
        self.large_object.iter_mut().flatten().for_each(|a| a.flush());
        self.free_list.iter_mut().flatten().for_each(|a| a.flush());
    }
}

/// Which allocator in [`Allocators`] serves an allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AllocatorSelector {
    BumpPointer(u8),
    LargeObject(u8),
    FreeList(u8),
    #[default]
    None,
}

// Some tests are conditionally compiled. So not all the code in this module will be used. We simply allow dead code in this module.
#![allow(dead_code)]

use atomic_refcell::AtomicRefCell;
use std::sync::Once;

use crate::memory_manager;
use crate::plan::{AllocationHint, Mutator};
use crate::util::memory::HeapMemory;
use crate::util::options::{GCTriggerSelector, PlanSelector};
use crate::util::test_util::mock_vm::{self, object, MockVM};
use crate::util::{ObjectReference, VMMutatorThread, VMThread};
use crate::AllocationSemantics;
use crate::MMTKBuilder;
use crate::MMTK;

pub const KB: usize = 1024;
pub const MB: usize = 1024 * KB;

pub trait FixtureContent {
    fn create() -> Self;
}

/// Content created once and shared by every test that uses it.
pub struct Fixture<T: FixtureContent> {
    content: AtomicRefCell<Option<Box<T>>>,
    once: Once,
}

unsafe impl<T: FixtureContent> Sync for Fixture<T> {}

impl<T: FixtureContent> Fixture<T> {
    pub fn new() -> Self {
        Self {
            content: AtomicRefCell::new(None),
            once: Once::new(),
        }
    }

    pub fn with_fixture<F: Fn(&T)>(&self, func: F) {
        self.once.call_once(|| {
            let content = Box::new(T::create());
            let mut borrow = self.content.borrow_mut();
            *borrow = Some(content);
        });
        let borrow = self.content.borrow();
        func(borrow.as_ref().unwrap())
    }
}

impl<T: FixtureContent> Default for Fixture<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A collector instance. It is never freed: its collector threads keep
/// running until the test process exits.
pub struct MMTKFixture {
    pub mmtk: &'static MMTK<MockVM>,
}

impl FixtureContent for MMTKFixture {
    fn create() -> Self {
        Self::create_with_builder(|builder| builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(MB), true)
    }
}

impl MMTKFixture {
    pub fn create_with_builder<F>(with_builder: F, initialize_collection: bool) -> Self
    where
        F: FnOnce(&mut MMTKBuilder),
    {
        let mut builder = MMTKBuilder::new_no_env_vars();
        builder.options.threads = 2;
        with_builder(&mut builder);

        let mmtk: &'static MMTK<MockVM> = Box::leak(memory_manager::mmtk_init(&builder));
        if initialize_collection {
            memory_manager::initialize_collection(mmtk, VMThread::UNINITIALIZED);
        }
        MMTKFixture { mmtk }
    }

    pub fn heap(&self) -> &HeapMemory {
        memory_manager::heap(self.mmtk)
    }
}

/// A collector instance with one bound mutator, and helpers to build an
/// object graph through the public API.
pub struct MutatorFixture {
    pub mmtk: &'static MMTK<MockVM>,
    pub mutator: Box<Mutator<MockVM>>,
    pub tls: VMMutatorThread,
}

impl MutatorFixture {
    pub fn create(plan: PlanSelector, heap_size: usize) -> Self {
        Self::create_with_builder(|builder| {
            builder.options.plan = plan;
            builder.options.gc_trigger = GCTriggerSelector::FixedHeapSize(heap_size);
        })
    }

    pub fn create_with_builder<F>(with_builder: F) -> Self
    where
        F: FnOnce(&mut MMTKBuilder),
    {
        let mmtk = MMTKFixture::create_with_builder(with_builder, true).mmtk;
        let tls = mock_vm::new_mutator_tls();
        let mutator = memory_manager::bind_mutator(mmtk, tls);
        MutatorFixture { mmtk, mutator, tls }
    }

    pub fn heap(&self) -> &'static HeapMemory {
        memory_manager::heap(self.mmtk)
    }

    /// Allocate and set up an object. Returns `None` if the heap is out of memory.
    pub fn try_alloc(
        &mut self,
        shape: object::Shape,
        semantics: AllocationSemantics,
        hint: AllocationHint,
    ) -> Option<ObjectReference> {
        let bytes = object::bytes_for(shape.refs, shape.data);
        let addr = memory_manager::alloc_with_hint(&mut self.mutator, bytes, 8, 0, semantics, hint);
        let object = ObjectReference::from_raw_address(addr)?;
        object::write_shape(self.heap(), object, shape);
        memory_manager::post_alloc(&mut self.mutator, object, bytes, semantics);
        Some(object)
    }

    pub fn alloc(&mut self, refs: usize, data: usize) -> ObjectReference {
        self.alloc_with(object::Shape::new(refs, data, 0), AllocationSemantics::Default)
    }

    pub fn alloc_with(&mut self, shape: object::Shape, semantics: AllocationSemantics) -> ObjectReference {
        self.try_alloc(shape, semantics, AllocationHint::None)
            .unwrap_or_else(|| panic!("Out of memory allocating {:?}", shape))
    }

    /// Store `target` into slot `i` of `src` through the write barrier.
    pub fn write(&mut self, src: ObjectReference, i: usize, target: Option<ObjectReference>) {
        memory_manager::object_reference_write(&mut self.mutator, src, object::ref_slot(src, i), target);
    }

    pub fn read(&self, src: ObjectReference, i: usize) -> Option<ObjectReference> {
        object::get_ref(self.heap(), src, i)
    }

    /// Make `object` a root of this mutator thread. Returns its index among the roots.
    pub fn add_root(&mut self, object: ObjectReference) -> usize {
        mock_vm::add_thread_root(self.tls, object);
        self.roots().len() - 1
    }

    /// The roots of this mutator thread, updated by moving GCs.
    pub fn roots(&self) -> Vec<ObjectReference> {
        mock_vm::thread_roots(self.tls)
    }

    pub fn root(&self, index: usize) -> ObjectReference {
        self.roots()[index]
    }

    pub fn clear_roots(&mut self) {
        mock_vm::set_thread_roots(self.tls, vec![]);
    }

    /// Run a GC and wait for it.
    pub fn gc(&mut self) {
        memory_manager::handle_user_collection_request(self.mmtk, self.tls, true);
    }

    pub fn is_live(&self, object: ObjectReference) -> bool {
        memory_manager::is_live_object(self.mmtk, object)
    }
}

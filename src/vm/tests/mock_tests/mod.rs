// Mock tests drive a whole collector through the public API, with MockVM as
// the runtime. Every test builds its own collector instance, and runs
// through `with_mockvm` so that the root registries are not shared.
//
// Mock tests need the feature `mock_test` and the prefix 'mock_test_' in their file name.

// Common includes for mock tests.
pub(crate) mod mock_test_prelude {
    pub use crate::memory_manager;
    pub use crate::plan::{AllocationHint, AllocationSemantics, TriggerReason};
    pub use crate::util::options::{GCTriggerSelector, PlanSelector};
    pub use crate::util::test_util::fixtures::*;
    pub use crate::util::test_util::mock_vm::object::{self, Shape};
    pub use crate::util::test_util::mock_vm::*;
    pub use crate::util::ObjectReference;
    pub use crate::vm::*;
}

mod mock_test_allocate_unrealistically_large_object;
mod mock_test_allocate_without_initialize_collection;
mod mock_test_builder_options;
mod mock_test_gencopy_nursery_overflow;
mod mock_test_gencopy_pretenure;
mod mock_test_gencopy_remembered_forwarding;
mod mock_test_gencopy_stale_references;
mod mock_test_genrc_promotion;
mod mock_test_harness;
mod mock_test_marksweep_reclaims_unreachable;
mod mock_test_memory_region_copy;
mod mock_test_multithreaded_mutators;
mod mock_test_rc_barrier_frees_overwritten;
mod mock_test_random_graph;
mod mock_test_rc_garbage_cycle;
mod mock_test_shared_root_copied_once;
mod mock_test_soft_reference_cleared_before_oom;

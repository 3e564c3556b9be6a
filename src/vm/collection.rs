use crate::scheduler::CollectorContext;
use crate::util::alloc::AllocationError;
use crate::util::opaque_pointer::*;
use crate::vm::VMBinding;

/// Thread context for the spawned GC thread. It is used by spawn_gc_thread.
pub enum GCThreadContext<VM: VMBinding> {
    /// The thread runs one collector of the collector group. The spawned
    /// thread shall call [`crate::memory_manager::start_collector`].
    Collector(Box<CollectorContext<VM>>),
}

pub trait Collection<VM: VMBinding> {
    /// Ask the runtime to spawn a GC thread. The collector does not spawn
    /// threads itself, so the runtime can run GC code on its own threads.
    ///
    /// Arguments:
    /// * `tls`: The thread that called `initialize_collection()`.
    /// * `ctx`: The context for the GC thread, to be handed back to the collector.
    fn spawn_gc_thread(tls: VMThread, ctx: GCThreadContext<VM>);

    /// Inform the runtime of an out-of-memory error. The allocation that
    /// failed returns a zero address once this returns.
    ///
    /// Arguments:
    /// * `tls`: The thread pointer for the mutator which failed the allocation and triggered the OOM.
    /// * `err_kind`: The type of OOM error that was encountered.
    fn out_of_memory(_tls: VMThread, err_kind: AllocationError) {
        panic!("Out of memory with {:?}!", err_kind);
    }
}

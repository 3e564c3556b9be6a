//! The collector instance.

use crate::global_state::GlobalState;
use crate::plan::gc_requester::GCRequester;
use crate::plan::{create_plan, CreateGeneralPlanArgs, Mutator, Plan, TriggerReason};
use crate::scheduler::{CollectorContext, Rendezvous, SafepointMonitor};
use crate::util::heap::gc_trigger::GCTrigger;
use crate::util::log;
use crate::util::opaque_pointer::*;
use crate::util::options::Options;
use crate::util::reference_processor::ReferenceProcessor;
use crate::util::statistics::Stats;
use crate::vm::{Collection, GCThreadContext, VMBinding};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

/// MMTKBuilder holds the options before the collector is created. The
/// options are read from `ULTERIOR_`-prefixed environment variables when the
/// builder is created, and can be changed with [`MMTKBuilder::set_option`].
pub struct MMTKBuilder {
    pub options: Options,
}

impl MMTKBuilder {
    /// Create an MMTK builder with options read from environment variables.
    pub fn new() -> Self {
        MMTKBuilder {
            options: Options::default(),
        }
    }

    /// Create an MMTK builder with default options, ignoring the environment.
    pub fn new_no_env_vars() -> Self {
        MMTKBuilder {
            options: Options::new_without_env_vars(),
        }
    }

    /// Set an option. Returns false if the name is unknown or the value is invalid.
    pub fn set_option(&mut self, name: &str, val: &str) -> bool {
        self.options.set_from_str(name, val)
    }

    /// Set options in bulk, given as whitespace-separated `name=value` pairs.
    pub fn set_options_bulk_by_str(&mut self, options: &str) -> bool {
        options.split_ascii_whitespace().all(|opt| match opt.split_once('=') {
            Some((name, val)) => self.set_option(name, val),
            None => {
                log::warn!("Option {:?} is not in the form name=value", opt);
                false
            }
        })
    }

    /// Build an MMTK instance from the builder.
    pub fn build<VM: VMBinding>(&self) -> MMTK<VM> {
        MMTK::new(Arc::new(self.options.clone()))
    }
}

impl Default for MMTKBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound mutator, as seen by the collector. The runtime owns the
/// mutator through the `Box` returned by [`crate::memory_manager::bind_mutator`].
pub(crate) struct MutatorPtr<VM: VMBinding>(*mut Mutator<VM>);

impl<VM: VMBinding> MutatorPtr<VM> {
    /// # Safety
    /// The mutator must be stopped, and no one else may access it.
    pub unsafe fn as_mut<'a>(&self) -> &'a mut Mutator<VM> {
        &mut *self.0
    }

    /// # Safety
    /// The mutator must be stopped.
    pub unsafe fn as_ref<'a>(&self) -> &'a Mutator<VM> {
        &*self.0
    }
}

impl<VM: VMBinding> Clone for MutatorPtr<VM> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<VM: VMBinding> Copy for MutatorPtr<VM> {}

// SAFETY: the pointer is only dereferenced by collectors while the mutator is stopped.
unsafe impl<VM: VMBinding> Send for MutatorPtr<VM> {}
unsafe impl<VM: VMBinding> Sync for MutatorPtr<VM> {}

/// An MMTK instance: the plan and the state shared by mutators and
/// collectors. A runtime usually creates one instance and keeps it in a
/// static; most of the API needs `&'static MMTK`.
pub struct MMTK<VM: VMBinding> {
    pub(crate) options: Arc<Options>,
    pub(crate) state: Arc<GlobalState>,
    pub(crate) plan: Box<dyn Plan<VM = VM>>,
    pub(crate) gc_trigger: Arc<GCTrigger<VM>>,
    pub(crate) monitor: Arc<SafepointMonitor>,
    pub(crate) stats: Arc<Stats>,
    pub(crate) reference_processor: ReferenceProcessor,
    pub(crate) rendezvous: Arc<Rendezvous>,
    mutators: Mutex<Vec<MutatorPtr<VM>>>,
}

impl<VM: VMBinding> MMTK<VM> {
    pub fn new(options: Arc<Options>) -> Self {
        let state = Arc::new(GlobalState::default());
        let gc_trigger = Arc::new(GCTrigger::new(&options));
        let monitor = Arc::new(SafepointMonitor::new());
        let stats = Arc::new(Stats::new());

        let plan = create_plan(
            options.plan,
            CreateGeneralPlanArgs {
                options: options.clone(),
                state: state.clone(),
                gc_trigger: gc_trigger.clone(),
                monitor: monitor.clone(),
                stats: stats.clone(),
            },
        );

        MMTK {
            rendezvous: Arc::new(Rendezvous::new(options.threads)),
            options,
            state,
            plan,
            gc_trigger,
            monitor,
            stats,
            reference_processor: ReferenceProcessor::new(),
            mutators: Mutex::new(vec![]),
        }
    }

    /// Spawn the collector threads and allow GCs. Called once, through
    /// [`crate::memory_manager::initialize_collection`].
    pub(crate) fn initialize_collection(&'static self, tls: VMThread) {
        assert!(
            !self.state.is_initialized(),
            "Collection has been initialized (was initialize_collection() already called before?)"
        );
        self.gc_trigger.set_plan(self.get_plan());
        for ordinal in 0..self.options.threads {
            let ctx = CollectorContext::new(ordinal, self);
            VM::VMCollection::spawn_gc_thread(tls, GCThreadContext::Collector(Box::new(ctx)));
        }
        self.state.initialized.store(true, Ordering::SeqCst);
        log::info!("Spawned {} collector threads", self.options.threads);
    }

    /// Register a new mutator with the collectors.
    pub(crate) fn register_mutator(&self, mutator: &mut Mutator<VM>) {
        self.monitor.register_mutator();
        // Do not join the registry in the middle of a GC.
        self.monitor.yieldpoint();
        self.mutators.lock().unwrap().push(MutatorPtr(mutator as *mut _));
    }

    pub(crate) fn unregister_mutator(&self, mutator: &mut Mutator<VM>) {
        let ptr = mutator as *mut Mutator<VM>;
        self.mutators.lock().unwrap().retain(|m| m.0 != ptr);
        self.monitor.unregister_mutator();
    }

    /// The bound mutators.
    pub(crate) fn mutators(&self) -> Vec<MutatorPtr<VM>> {
        self.mutators.lock().unwrap().clone()
    }

    /// Ask for a GC on behalf of the runtime, and wait for it.
    pub(crate) fn handle_user_collection_request(&self, _tls: VMMutatorThread, force: bool) {
        if self.options.ignore_system_gc && !force {
            log::info!("User triggered collection ignored");
            return;
        }
        let epoch = self.gc_requester().request(TriggerReason::External);
        self.monitor.block_for_gc(epoch);
    }

    /// Ask for a GC without waiting for it.
    pub(crate) fn request_async_collection(&self) -> usize {
        self.gc_requester().request(TriggerReason::External)
    }

    fn gc_requester(&self) -> &GCRequester {
        &self.plan.base().gc_requester
    }

    /// Start a measured region: collect the heap, then gather statistics.
    pub(crate) fn harness_begin(&self, tls: VMMutatorThread) {
        self.handle_user_collection_request(tls, true);
        self.state.inside_harness.store(true, Ordering::SeqCst);
        self.stats.start_all();
    }

    pub(crate) fn harness_end(&self) {
        self.stats.stop_all();
        self.state.inside_harness.store(false, Ordering::SeqCst);
    }

    pub fn get_plan(&self) -> &dyn Plan<VM = VM> {
        self.plan.as_ref()
    }

    pub fn get_options(&self) -> &Options {
        &self.options
    }

    pub fn get_state(&self) -> &GlobalState {
        &self.state
    }

    pub fn get_stats(&self) -> &Stats {
        &self.stats
    }
}

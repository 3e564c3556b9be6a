//! The collector threads.
//!
//! A fixed group of collectors serves every GC. Each GC runs as a sequence
//! of phases separated by rendezvous; the first thread to arrive at the
//! first rendezvous of a GC is elected to do the global work of a phase
//! while the others wait. Parallel phases split the mutators by ordinal and
//! share the tracing work through the trace deque.

use crate::mmtk::{MutatorPtr, MMTK};
use crate::plan::{Plan, TriggerReason};
use crate::scheduler::Rendezvous;
use crate::util::copy::GCWorkerCopyContext;
use crate::util::deque::LocalDeque;
use crate::util::log;
use crate::util::opaque_pointer::*;
use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, RootVisitor, Scanning, VMBinding};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Thread-local deques of the reference counting plans.
pub struct RcLocal {
    pub modbuf: LocalDeque,
    pub decbuf: LocalDeque,
    pub new_roots: LocalDeque,
    pub old_roots: LocalDeque,
    pub purple: LocalDeque,
}

impl RcLocal {
    pub fn flush(&mut self) {
        self.modbuf.flush();
        self.decbuf.flush();
        self.new_roots.flush();
        self.old_roots.flush();
        self.purple.flush();
    }
}

/// The state of one collector thread.
pub struct CollectorContext<VM: VMBinding> {
    /// The position of this collector in the group, from 0.
    pub ordinal: usize,
    pub tls: VMWorkerThread,
    pub(crate) mmtk: &'static MMTK<VM>,
    pub(crate) plan: &'static dyn Plan<VM = VM>,
    /// Objects to scan.
    pub(crate) trace: LocalDeque,
    pub(crate) copy: GCWorkerCopyContext<VM>,
    pub(crate) rc: Option<RcLocal>,
    last_epoch: usize,
    rendezvous: Arc<Rendezvous>,
}

impl<VM: VMBinding> CollectorContext<VM> {
    pub(crate) fn new(ordinal: usize, mmtk: &'static MMTK<VM>) -> Self {
        let plan = mmtk.get_plan();
        let tls = VMWorkerThread(VMThread::UNINITIALIZED);
        let rc = plan.rc_base().map(|base| base.create_local());
        CollectorContext {
            ordinal,
            tls,
            mmtk,
            plan,
            trace: LocalDeque::new(plan.base().trace.clone()),
            copy: GCWorkerCopyContext::new(tls, plan, plan.create_copy_config()),
            rc,
            last_epoch: 0,
            rendezvous: mmtk.rendezvous.clone(),
        }
    }

    /// The number of collectors.
    pub fn parties(&self) -> usize {
        self.rendezvous.parties()
    }

    /// Wait for every collector. Returns 1 on exactly one thread.
    pub fn rendezvous(&self) -> usize {
        self.rendezvous.rendezvous()
    }

    pub fn is_primary(&self) -> bool {
        self.ordinal == 0
    }

    /// The thread-local reference counting deques. Panics for tracing plans.
    pub(crate) fn rc_local(&mut self) -> &mut RcLocal {
        match self.rc.as_mut() {
            Some(rc) => rc,
            None => panic!("The current plan does not count references"),
        }
    }

    /// The collector loop. Never returns.
    pub fn run(&mut self, tls: VMWorkerThread) {
        self.tls = tls;
        log::debug!("Collector {} started on {:?}", self.ordinal, tls);
        loop {
            let epoch = self.mmtk.monitor.wait_for_request(self.last_epoch);
            self.collect(epoch);
            self.last_epoch = epoch;
        }
    }

    /// Run one GC together with the rest of the group.
    pub(crate) fn collect(&mut self, epoch: usize) {
        let mmtk = self.mmtk;
        let plan = self.plan;
        let n = self.parties();

        if self.rendezvous() == 1 {
            self.start_gc(epoch);
        }
        self.rendezvous();

        for mutator in self.my_mutators() {
            // SAFETY: mutators are stopped, and each one is handled by one collector.
            let mutator = unsafe { mutator.as_mut() };
            mutator.flush();
            mutator.prepare(self.tls);
        }
        self.copy.prepare();
        plan.prepare_worker(self);
        self.rendezvous();

        self.scan_roots();
        self.process_trace();

        if self.rendezvous() == 1 {
            plan.base().trace.prepare(n);
            if plan.retains_soft_refs() && !mmtk.state.is_clear_soft_refs() {
                self.retain_soft_referents();
            }
        }
        self.rendezvous();
        self.process_trace();
        self.rendezvous();

        self.copy.release();
        plan.release_worker(self);
        for mutator in self.my_mutators() {
            // SAFETY: as above.
            let mutator = unsafe { mutator.as_mut() };
            mutator.release(self.tls);
        }

        if self.rendezvous() == 1 {
            self.end_gc(epoch);
        }
        self.rendezvous();
    }

    fn start_gc(&mut self, epoch: usize) {
        let mmtk = self.mmtk;
        let plan = self.plan;
        let state = &mmtk.state;

        mmtk.monitor.stop_mutators(epoch);
        let reason = plan.base().gc_requester.reason();
        plan.base().gc_requester.clear_request();
        state.set_gc_in_progress(true);
        state.emergency_collection.store(reason == TriggerReason::Internal, Ordering::Relaxed);
        state.user_triggered_collection.store(reason == TriggerReason::External, Ordering::Relaxed);
        mmtk.stats.start_gc(reason);
        mmtk.gc_trigger.on_gc_start();
        log::info!(
            "[GC {}] start ({:?}), {} / {} pages reserved",
            epoch,
            reason,
            plan.get_reserved_pages(),
            plan.get_total_pages()
        );

        if state.is_user_triggered_collection() {
            state.reset_collection_attempts();
        } else {
            let attempts = state.determine_collection_attempts();
            log::debug!("Collection attempt {}", attempts);
        }

        plan.prepare(self.tls);
        plan.base().trace.prepare(self.parties());
    }

    fn end_gc(&mut self, epoch: usize) {
        let mmtk = self.mmtk;
        let plan = self.plan;
        let state = &mmtk.state;

        let cleared = mmtk.reference_processor.process::<VM>(
            &plan.base().heap,
            |o| plan.is_live(o),
            |o| plan.get_forwarded(o),
        );
        if cleared > 0 {
            log::debug!("Cleared {} soft referents", cleared);
        }
        plan.release(self.tls);
        plan.end_of_gc(self.tls);
        state
            .last_collection_was_exhaustive
            .store(plan.last_collection_was_exhaustive(), Ordering::Relaxed);
        mmtk.gc_trigger.on_gc_end();
        mmtk.stats.end_gc();
        log::info!(
            "[GC {}] end, {} / {} pages reserved. {}",
            epoch,
            plan.get_reserved_pages(),
            plan.get_total_pages(),
            mmtk.stats.last_gc_summary()
        );
        state.set_gc_in_progress(false);
        state.reset_collection_trigger();
        mmtk.monitor.resume_mutators(epoch);
    }

    /// The mutators this collector scans and prepares.
    fn my_mutators(&self) -> Vec<MutatorPtr<VM>> {
        let n = self.parties();
        self.mmtk
            .mutators()
            .into_iter()
            .enumerate()
            .filter(|(j, _)| j % n == self.ordinal)
            .map(|(_, m)| m)
            .collect()
    }

    fn scan_roots(&mut self) {
        let plan = self.plan;
        let mmtk = self.mmtk;
        let stats = &mmtk.stats;
        for mutator in self.my_mutators() {
            // SAFETY: mutators are stopped.
            let tls = unsafe { mutator.as_ref() }.get_tls();
            VM::VMScanning::scan_roots_in_mutator_thread(tls, &mut |root: &mut ObjectReference| {
                *root = plan.trace_object(self, *root, true);
                stats.roots.inc();
            });
        }
        if self.is_primary() {
            let mut visitor = |root: &mut ObjectReference| {
                *root = plan.trace_object(self, *root, true);
                stats.roots.inc();
            };
            VM::VMScanning::scan_vm_specific_roots(&mut visitor as &mut dyn RootVisitor);
            plan.trace_remembered(self);
        }
        self.trace.flush();
    }

    /// Scan objects until every collector runs out of work.
    fn process_trace(&mut self) {
        let plan = self.plan;
        let heap = &plan.base().heap;
        while let Some(object) = self.trace.pop() {
            let mut slots = vec![];
            VM::VMObjectModel::scan_object(heap, object, &mut |slot: Address| slots.push(slot));
            for slot in slots {
                if let Some(child) = heap.load_reference(slot) {
                    let new_child = plan.trace_object(self, child, false);
                    if new_child != child {
                        heap.store_reference(slot, Some(new_child));
                    }
                }
            }
        }
    }

    fn retain_soft_referents(&mut self) {
        let plan = self.plan;
        let mmtk = self.mmtk;
        mmtk.reference_processor.retain::<VM>(
            &plan.base().heap,
            |o| plan.is_live(o),
            |o| plan.get_forwarded(o),
            |o| plan.trace_object(self, o, false),
        );
        self.trace.flush();
    }
}

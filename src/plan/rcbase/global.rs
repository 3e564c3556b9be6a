use crate::plan::barriers::RCBarrier;
use crate::plan::global::{CommonPlan, CreateSpecificPlanArgs};
use crate::plan::mutator_context::Mutator;
use crate::plan::Plan;
use crate::policy::refcount::sanity::SanityChecker;
use crate::policy::refcount::{CycleDetector, CycleHost, RefCountSpace};
use crate::policy::space::Space;
use crate::scheduler::{CollectorContext, RcLocal};
use crate::util::deque::{LocalDeque, SharedDeque};
use crate::util::header::rc::{self, DecResult};
use crate::util::header::status;
use crate::util::log;
use crate::util::memory::HeapMemory;
use crate::util::opaque_pointer::VMWorkerThread;
use crate::util::statistics::Counter;
use crate::util::{Address, ObjectReference};
use crate::vm::{ObjectModel, RootVisitor, Scanning, VMBinding};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The name of the reference counted space.
pub const RC_SPACE: &str = "rc";

/// How many decrements to apply between two looks at the clock.
const DECS_PER_DEADLINE_CHECK: usize = 2000;

/// The reference counted mature space, the common spaces, and the buffers
/// that carry counting work from one GC to the next.
pub struct RcBase<VM: VMBinding> {
    pub rc_space: RefCountSpace<VM>,
    pub common: CommonPlan<VM>,
    /// Objects whose referents must be incremented at the next GC.
    pub modbuf: Arc<SharedDeque>,
    /// Pending decrements.
    pub decbuf: Arc<SharedDeque>,
    /// Objects referenced from roots in the current GC.
    pub new_roots: Arc<SharedDeque>,
    /// Objects that were referenced from roots in the last GC.
    pub old_roots: Arc<SharedDeque>,
    pub cycle_detector: CycleDetector<VM>,
    /// Counted objects that have not been freed.
    live_objects: AtomicUsize,
    /// Did the current GC leave decrements for the next one?
    decs_deferred: AtomicBool,
    /// Was every dead object freed by the last GC?
    exhaustive: AtomicBool,
}

impl<VM: VMBinding> RcBase<VM> {
    pub fn new(args: &CreateSpecificPlanArgs<VM>) -> Self {
        let common = CommonPlan::new(args);
        let pool = common.base.meta_pool.clone();
        RcBase {
            rc_space: RefCountSpace::new(args.get_space_args(RC_SPACE)),
            modbuf: Arc::new(SharedDeque::new("modbuf", pool.clone())),
            decbuf: Arc::new(SharedDeque::new("decbuf", pool.clone())),
            new_roots: Arc::new(SharedDeque::new("new_roots", pool.clone())),
            old_roots: Arc::new(SharedDeque::new("old_roots", pool.clone())),
            cycle_detector: CycleDetector::new(Arc::new(SharedDeque::new("purple", pool))),
            common,
            live_objects: AtomicUsize::new(0),
            decs_deferred: AtomicBool::new(false),
            exhaustive: AtomicBool::new(true),
        }
    }

    /// Thread-local views of the counting buffers for one collector.
    pub fn create_local(&self) -> RcLocal {
        RcLocal {
            modbuf: LocalDeque::new(self.modbuf.clone()),
            decbuf: LocalDeque::new(self.decbuf.clone()),
            new_roots: LocalDeque::new(self.new_roots.clone()),
            old_roots: LocalDeque::new(self.old_roots.clone()),
            purple: LocalDeque::new(self.cycle_detector.purple().clone()),
        }
    }

    pub fn get_spaces(&self) -> Vec<&dyn Space<VM>> {
        let mut ret = self.common.get_spaces();
        ret.push(&self.rc_space);
        ret
    }

    pub fn get_used_pages(&self) -> usize {
        self.rc_space.reserved_pages() + self.common.get_used_pages()
    }

    pub fn live_objects(&self) -> usize {
        self.live_objects.load(Ordering::Relaxed)
    }

    pub fn last_collection_was_exhaustive(&self) -> bool {
        self.exhaustive.load(Ordering::Relaxed)
    }

    pub fn prepare(&self, tls: VMWorkerThread) {
        self.common.prepare(tls, false);
        self.decs_deferred.store(false, Ordering::Relaxed);
    }

    pub fn release(&self, tls: VMWorkerThread) {
        self.common.release(tls, false);
    }

    /// Set up a new object outside the nursery. Counted objects start with
    /// one increment that a buffered decrement balances at the next GC.
    /// Every object is logged so that its referents get counted then.
    pub fn post_alloc(&self, mutator: &mut Mutator<VM>, object: ObjectReference) {
        let heap = self.heap();
        let counted = self.is_rc_object(object);
        if counted {
            rc::initialize_header(heap, object, true, VM::VMObjectModel::is_acyclic(heap, object));
            self.live_objects.fetch_add(1, Ordering::Relaxed);
        }
        match mutator.barrier.as_mut().downcast_mut::<RCBarrier<VM>>() {
            Some(barrier) => barrier.record_new_object(object, counted),
            None => panic!("Reference counting mutators must use the RC barrier"),
        }
    }

    /// A nursery object was just promoted into the counted space. It starts
    /// uncounted; every reference the trace finds increments it.
    pub fn post_copy(&self, object: ObjectReference) {
        let heap = self.heap();
        rc::clear_gc_bits(heap, object);
        status::make_unlogged(heap, object);
        self.live_objects.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a reference to a mature object. References from roots only
    /// flag the object. Mature objects are never scanned by the trace.
    pub fn trace_rc(&self, rc_local: &mut RcLocal, object: ObjectReference, root: bool) -> ObjectReference {
        let heap = self.heap();
        let stats = &self.common.base.stats;
        if root {
            if rc::set_root(heap, object) {
                rc_local.new_roots.push(object);
            }
        } else {
            rc::inc(heap, object);
            stats.incs.inc();
        }
        object
    }

    /// Increment the current referents of every object the barrier logged,
    /// and unlog the objects. Referents are traced through the plan, so
    /// nursery referents get promoted.
    pub fn trace_remembered(&self, ctx: &mut CollectorContext<VM>) {
        let plan = ctx.plan;
        let heap = self.heap();
        let stats = &self.common.base.stats;
        let mut modbuf = LocalDeque::new(self.modbuf.clone());
        stats.inc_time.start();
        while let Some(object) = modbuf.try_pop() {
            status::make_unlogged(heap, object);
            let mut slots = vec![];
            VM::VMObjectModel::scan_object(heap, object, &mut |slot: Address| slots.push(slot));
            for slot in slots {
                if let Some(child) = heap.load_reference(slot) {
                    let new_child = plan.trace_object(ctx, child, false);
                    if new_child != child {
                        heap.store_reference(slot, Some(new_child));
                    }
                }
            }
        }
        stats.inc_time.stop();
    }

    /// The counting part of a GC. Every collector runs this after the trace.
    pub fn release_worker(&self, ctx: &mut CollectorContext<VM>) {
        let n = ctx.parties();
        let options = &self.common.base.options;

        if ctx.rendezvous() == 1 {
            self.old_roots.prepare(n);
            self.decbuf.prepare(n);
        }
        ctx.rendezvous();

        self.process_old_roots(ctx.rc_local());
        ctx.rc_local().flush();
        ctx.rendezvous();

        // Sanity checking needs every decrement applied.
        let deadline = if options.gc_time_cap > 0 && !options.rc_sanity_check {
            Some(Instant::now() + Duration::from_millis(options.gc_time_cap as u64))
        } else {
            None
        };
        if ctx.is_primary() {
            self.common.base.stats.dec_time.start();
        }
        if self.process_decs(ctx.rc_local(), deadline) {
            self.decs_deferred.store(true, Ordering::Relaxed);
        }
        ctx.rc_local().flush();
        ctx.rendezvous();
        if ctx.is_primary() {
            self.common.base.stats.dec_time.stop();
        }

        if ctx.rendezvous() == 1 {
            self.finish_counting(ctx);
        }
        ctx.rendezvous();
    }

    /// Objects that were rooted in the last GC but not in this one lost a
    /// reference the counts never saw.
    fn process_old_roots(&self, rc_local: &mut RcLocal) {
        let heap = self.heap();
        while let Some(object) = rc_local.old_roots.pop() {
            if rc::is_root_reachable(heap, object) {
                continue;
            }
            if !rc::is_live_rc(heap, object) {
                self.kill(rc_local, object);
            } else if rc::make_purple(heap, object) {
                self.common.base.stats.purple.inc();
                CycleDetector::<VM>::possible_cycle_root(&mut rc_local.purple, object);
            }
        }
    }

    /// Apply decrements until every collector runs out of them. Returns true
    /// if this thread gave up at the deadline, leaving the rest in the
    /// buffer for the next GC.
    fn process_decs(&self, rc_local: &mut RcLocal, deadline: Option<Instant>) -> bool {
        let mut count = 0;
        while let Some(object) = rc_local.decbuf.pop() {
            self.decrement(rc_local, object);
            count += 1;
            if let Some(deadline) = deadline {
                if count % DECS_PER_DEADLINE_CHECK == 0 && Instant::now() > deadline {
                    rc_local.decbuf.flush();
                    self.decbuf.leave();
                    log::debug!("Deferred decrements after {} on this thread", count);
                    return true;
                }
            }
        }
        false
    }

    fn decrement(&self, rc_local: &mut RcLocal, object: ObjectReference) {
        if !self.is_rc_object(object) {
            return;
        }
        let stats = &self.common.base.stats;
        stats.decs.inc();
        match rc::dec(self.heap(), object) {
            DecResult::Kill => self.kill(rc_local, object),
            DecResult::Buffer => {
                stats.purple.inc();
                CycleDetector::<VM>::possible_cycle_root(&mut rc_local.purple, object);
            }
            DecResult::Purple | DecResult::Sticky => {}
        }
    }

    /// The object is dead. Decrement its children and free it, unless the
    /// purple buffer still holds it; the cycle detector frees it then.
    fn kill(&self, rc_local: &mut RcLocal, object: ObjectReference) {
        let heap = self.heap();
        VM::VMObjectModel::scan_object(heap, object, &mut |slot: Address| {
            if let Some(child) = heap.load_reference(slot) {
                if self.is_rc_object(child) {
                    rc_local.decbuf.push(child);
                }
            }
        });
        rc::make_black(heap, object);
        if !rc::is_buffered(heap, object) {
            self.free(object);
        }
    }

    /// Runs on one collector once every decrement of this GC is applied.
    fn finish_counting(&self, ctx: &mut CollectorContext<VM>) {
        let options = &self.common.base.options;
        let stats = &self.common.base.stats;
        let emergency = self.common.base.state.is_emergency_collection();

        // Every block is free of allocators, and every applied decrement has freed its object.
        self.rc_space.release();

        stats.cycle_time.start();
        let freed = if options.cycle_detection {
            self.cycle_detector.collect_cycles(
                self,
                &mut ctx.rc_local().decbuf,
                emergency,
                options.cycle_trigger_threshold,
            )
        } else {
            self.cycle_detector.release_candidates(self)
        };
        stats.cycle_time.stop();
        ctx.rc_local().decbuf.flush();

        let deferred = self.decs_deferred.load(Ordering::Relaxed);
        let mut freed_after_sweep = freed;
        if !deferred && (freed || !self.decbuf.is_empty()) {
            // Garbage freed by the cycle detector drops the counts of its green children.
            self.decbuf.prepare(1);
            self.process_decs(ctx.rc_local(), None);
            ctx.rc_local().flush();
            freed_after_sweep = true;
        }
        if freed_after_sweep {
            self.rc_space.release();
        }

        // Without cycle detection, garbage cycles are never reclaimed.
        let exhaustive =
            options.cycle_detection && !deferred && self.cycle_detector.purple().is_empty() && self.decbuf.is_empty();
        self.exhaustive.store(exhaustive, Ordering::Relaxed);
        log::debug!(
            "{} objects counted live, {} decrements pending, exhaustive: {}",
            self.live_objects(),
            self.decbuf.entries(),
            exhaustive
        );

        if options.rc_sanity_check {
            self.check_sanity(ctx, exhaustive);
        }

        // This GC's roots are the next GC's old roots.
        let heap = self.heap();
        let mut new_roots = LocalDeque::new(self.new_roots.clone());
        let mut old_roots = LocalDeque::new(self.old_roots.clone());
        while let Some(object) = new_roots.try_pop() {
            rc::unset_root(heap, object);
            old_roots.push(object);
        }
        old_roots.flush();
    }

    /// Compare the counts with a trace of the heap. A disagreement is a bug
    /// in the collector, so it is fatal.
    fn check_sanity(&self, ctx: &CollectorContext<VM>, exact: bool) {
        let mut roots = vec![];
        {
            let mut visitor = |root: &mut ObjectReference| roots.push(*root);
            for mutator in ctx.mmtk.mutators() {
                // SAFETY: mutators are stopped.
                let tls = unsafe { mutator.as_ref() }.get_tls();
                VM::VMScanning::scan_roots_in_mutator_thread(tls, &mut visitor as &mut dyn RootVisitor);
            }
            VM::VMScanning::scan_vm_specific_roots(&mut visitor as &mut dyn RootVisitor);
        }
        let sources = self.common.immortal.objects();
        let is_rc_object = |o: ObjectReference| self.is_rc_object(o);
        let checker = SanityChecker::<VM>::new(self.heap(), &is_rc_object, exact);
        match checker.check(&roots, &sources, self.live_objects()) {
            Ok(report) => log::info!(
                "RC sanity passed: {} reachable objects, {} counted edges",
                report.reachable,
                report.edges
            ),
            Err(e) => panic!("{}", e),
        }
    }
}

impl<VM: VMBinding> CycleHost for RcBase<VM> {
    fn heap(&self) -> &HeapMemory {
        &self.common.base.heap
    }

    fn is_rc_object(&self, object: ObjectReference) -> bool {
        self.rc_space.in_space(object) || self.common.los.in_space(object)
    }

    fn free(&self, object: ObjectReference) {
        self.live_objects.fetch_sub(1, Ordering::Relaxed);
        if self.rc_space.in_space(object) {
            self.rc_space.free(object);
        } else {
            self.common.los.free(object);
        }
        self.common.base.stats.freed.inc();
    }
}

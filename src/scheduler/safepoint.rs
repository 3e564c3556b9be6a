//! Stopping and resuming mutators.
//!
//! GCs are numbered by epochs. A request bumps the requested epoch, the
//! collectors serve epochs in order, and a GC is complete once the completed
//! epoch catches up. Mutators park at yieldpoints while a stop is requested,
//! and mutators waiting for a GC park until its epoch completes.

use crate::util::log;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

struct SafepointSync {
    /// The latest requested GC.
    requested: usize,
    /// The latest GC that stopped the mutators.
    started: usize,
    /// The latest GC that finished.
    completed: usize,
    /// Bound mutators.
    registered: usize,
    /// Bound mutators that are not parked.
    running: usize,
    stop_requested: bool,
}

pub struct SafepointMonitor {
    sync: Mutex<SafepointSync>,
    /// Mirrors `stop_requested` for the yieldpoint fast path.
    stop_flag: AtomicBool,
    /// Collectors wait here for requests.
    request_cv: Condvar,
    /// The elected collector waits here for mutators to park.
    parked_cv: Condvar,
    /// Parked mutators wait here.
    resume_cv: Condvar,
}

impl SafepointMonitor {
    pub fn new() -> Self {
        SafepointMonitor {
            sync: Mutex::new(SafepointSync {
                requested: 0,
                started: 0,
                completed: 0,
                registered: 0,
                running: 0,
                stop_requested: false,
            }),
            stop_flag: AtomicBool::new(false),
            request_cv: Condvar::new(),
            parked_cv: Condvar::new(),
            resume_cv: Condvar::new(),
        }
    }

    /// Ask for a GC. Returns the epoch of the GC that will serve the request.
    /// Requests are merged with a requested GC that has not stopped the mutators yet.
    pub fn request_collection(&self) -> usize {
        let mut sync = self.sync.lock().unwrap();
        if sync.requested == sync.started {
            sync.requested += 1;
            log::trace!("GC epoch {} requested", sync.requested);
            self.request_cv.notify_all();
        }
        sync.requested
    }

    pub fn requested_epoch(&self) -> usize {
        self.sync.lock().unwrap().requested
    }

    pub fn completed_epoch(&self) -> usize {
        self.sync.lock().unwrap().completed
    }

    /// Is a GC between stopping and resuming the mutators?
    pub fn gc_in_progress(&self) -> bool {
        let sync = self.sync.lock().unwrap();
        sync.started > sync.completed
    }

    /// Block a collector thread until there is a GC after `last` to serve.
    /// Returns the epoch of that GC.
    pub fn wait_for_request(&self, last: usize) -> usize {
        let mut sync = self.sync.lock().unwrap();
        while sync.completed < last || sync.requested <= sync.completed {
            sync = self.request_cv.wait(sync).unwrap();
        }
        sync.completed + 1
    }

    /// Called by the elected collector. Returns once every bound mutator is parked.
    pub fn stop_mutators(&self, epoch: usize) {
        let mut sync = self.sync.lock().unwrap();
        debug_assert_eq!(epoch, sync.completed + 1);
        sync.stop_requested = true;
        sync.started = epoch;
        self.stop_flag.store(true, Ordering::SeqCst);
        while sync.running > 0 {
            sync = self.parked_cv.wait(sync).unwrap();
        }
        log::debug!("GC epoch {}: {} mutators stopped", epoch, sync.registered);
    }

    /// Called by the elected collector at the end of a GC.
    pub fn resume_mutators(&self, epoch: usize) {
        let mut sync = self.sync.lock().unwrap();
        sync.stop_requested = false;
        sync.completed = epoch;
        self.stop_flag.store(false, Ordering::SeqCst);
        self.resume_cv.notify_all();
        // A request made during the GC is served next.
        self.request_cv.notify_all();
    }

    pub fn register_mutator(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.registered += 1;
        sync.running += 1;
    }

    pub fn unregister_mutator(&self) {
        let mut sync = self.sync.lock().unwrap();
        debug_assert!(sync.registered > 0 && sync.running > 0);
        sync.registered -= 1;
        sync.running -= 1;
        self.parked_cv.notify_all();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Park the calling mutator while a stop is requested.
    pub fn yieldpoint(&self) {
        if !self.stop_flag.load(Ordering::SeqCst) {
            return;
        }
        let sync = self.sync.lock().unwrap();
        let sync = self.park(sync, |s| s.stop_requested);
        drop(sync);
    }

    /// Park the calling mutator until GC `epoch` is complete.
    pub fn block_for_gc(&self, epoch: usize) {
        let sync = self.sync.lock().unwrap();
        let sync = self.park(sync, |s| s.completed < epoch || s.stop_requested);
        drop(sync);
    }

    /// The mutator will not touch the heap until [`SafepointMonitor::leave_gc_safe_region`].
    pub fn enter_gc_safe_region(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.running -= 1;
        self.parked_cv.notify_all();
    }

    pub fn leave_gc_safe_region(&self) {
        let mut sync = self.sync.lock().unwrap();
        while sync.stop_requested {
            sync = self.resume_cv.wait(sync).unwrap();
        }
        sync.running += 1;
    }

    fn park<'a>(
        &self,
        mut sync: std::sync::MutexGuard<'a, SafepointSync>,
        blocked: impl Fn(&SafepointSync) -> bool,
    ) -> std::sync::MutexGuard<'a, SafepointSync> {
        sync.running -= 1;
        self.parked_cv.notify_all();
        while blocked(&*sync) {
            sync = self.resume_cv.wait(sync).unwrap();
        }
        sync.running += 1;
        sync
    }
}

impl Default for SafepointMonitor {
    fn default() -> Self {
        Self::new()
    }
}

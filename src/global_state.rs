use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Global states of one collector instance. Plans, spaces and allocators keep
/// a reference to this struct instead of to the plan, so they can query the
/// state of the collector without caring which plan is running.
pub struct GlobalState {
    /// Whether the collector is ready for collection. Set by `initialize_collection()`.
    pub(crate) initialized: AtomicBool,
    /// Set between stopping and resuming the mutators.
    pub(crate) gc_in_progress: AtomicBool,
    /// Is the current GC an internally triggered retry after a GC that did not free enough?
    pub(crate) emergency_collection: AtomicBool,
    /// Is the current GC triggered by the user?
    pub(crate) user_triggered_collection: AtomicBool,
    /// Was the last GC a full heap GC?
    pub(crate) last_collection_was_exhaustive: AtomicBool,
    /// The next GC must clear soft referents instead of retaining them.
    pub(crate) clear_soft_refs: AtomicBool,
    /// Has an allocation succeeded since the last GC?
    pub(crate) allocation_success: AtomicBool,
    /// The most GCs a single allocation has triggered in a row.
    pub(crate) max_collection_attempts: AtomicUsize,
    /// The pages wanted by the allocation that triggered the current GC.
    pub(crate) pending_request_pages: AtomicUsize,
    /// Are we between `harness_begin` and `harness_end`?
    pub(crate) inside_harness: AtomicBool,
}

impl GlobalState {
    /// Is the collector initialized?
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_gc_in_progress(&self) -> bool {
        self.gc_in_progress.load(Ordering::SeqCst)
    }

    pub(crate) fn set_gc_in_progress(&self, v: bool) {
        self.gc_in_progress.store(v, Ordering::SeqCst);
    }

    pub fn is_emergency_collection(&self) -> bool {
        self.emergency_collection.load(Ordering::Relaxed)
    }

    /// Return true if this collection was triggered by application code.
    pub fn is_user_triggered_collection(&self) -> bool {
        self.user_triggered_collection.load(Ordering::Relaxed)
    }

    pub fn last_collection_was_exhaustive(&self) -> bool {
        self.last_collection_was_exhaustive.load(Ordering::Relaxed)
    }

    /// Are we between `harness_begin` and `harness_end`?
    pub fn is_inside_harness(&self) -> bool {
        self.inside_harness.load(Ordering::SeqCst)
    }

    pub fn is_clear_soft_refs(&self) -> bool {
        self.clear_soft_refs.load(Ordering::SeqCst)
    }

    pub(crate) fn set_clear_soft_refs(&self, v: bool) {
        self.clear_soft_refs.store(v, Ordering::SeqCst);
    }

    /// Count one more GC for an allocation that keeps failing. Returns the
    /// number of GCs the current allocation has triggered so far.
    pub(crate) fn determine_collection_attempts(&self) -> usize {
        if !self.allocation_success.swap(false, Ordering::Relaxed) {
            self.max_collection_attempts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.max_collection_attempts.store(1, Ordering::Relaxed);
        }
        self.max_collection_attempts.load(Ordering::Relaxed)
    }

    /// The number of GCs the current allocation has triggered so far.
    pub fn collection_attempts(&self) -> usize {
        self.max_collection_attempts.load(Ordering::Relaxed)
    }

    pub(crate) fn reset_collection_attempts(&self) {
        self.allocation_success.store(true, Ordering::Relaxed);
        self.max_collection_attempts.store(0, Ordering::Relaxed);
    }

    /// Reset collection state information.
    pub(crate) fn reset_collection_trigger(&self) {
        self.emergency_collection.store(false, Ordering::Relaxed);
        self.user_triggered_collection.store(false, Ordering::Relaxed);
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            gc_in_progress: AtomicBool::new(false),
            emergency_collection: AtomicBool::new(false),
            user_triggered_collection: AtomicBool::new(false),
            last_collection_was_exhaustive: AtomicBool::new(false),
            clear_soft_refs: AtomicBool::new(false),
            allocation_success: AtomicBool::new(false),
            max_collection_attempts: AtomicUsize::new(0),
            pending_request_pages: AtomicUsize::new(0),
            inside_harness: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_grow_until_an_allocation_succeeds() {
        let state = GlobalState::default();
        assert_eq!(state.determine_collection_attempts(), 1);
        assert_eq!(state.determine_collection_attempts(), 2);
        state.allocation_success.store(true, Ordering::Relaxed);
        assert_eq!(state.determine_collection_attempts(), 1);
    }
}

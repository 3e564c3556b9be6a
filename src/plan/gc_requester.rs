use crate::scheduler::SafepointMonitor;
use crate::util::log;
use atomic::Atomic;
use bytemuck::NoUninit;
use enum_map::Enum;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Why a GC was requested. Only diagnostics and the exhaustion check look at it.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Enum, NoUninit)]
pub enum TriggerReason {
    Unknown,
    /// The application asked for a GC.
    External,
    /// An allocation ran out of room.
    Resource,
    /// The collector itself retries after a GC that did not free enough.
    Internal,
}

/// Lets mutators trigger GC. Successive requests for the same GC are merged.
pub struct GCRequester {
    request_sync: Mutex<()>,
    request_flag: AtomicBool,
    reason: Atomic<TriggerReason>,
    monitor: Arc<SafepointMonitor>,
}

impl GCRequester {
    pub fn new(monitor: Arc<SafepointMonitor>) -> Self {
        GCRequester {
            request_sync: Mutex::new(()),
            request_flag: AtomicBool::new(false),
            reason: Atomic::new(TriggerReason::Unknown),
            monitor,
        }
    }

    /// Request a GC. Returns the epoch of the GC that will serve the request.
    pub fn request(&self, reason: TriggerReason) -> usize {
        if self.request_flag.load(Ordering::Relaxed) {
            return self.monitor.requested_epoch();
        }

        let _guard = self.request_sync.lock().unwrap();
        // Double-checked: only the first request of a GC records its reason.
        if !self.request_flag.load(Ordering::Relaxed) {
            self.request_flag.store(true, Ordering::Relaxed);
            self.reason.store(reason, Ordering::Relaxed);
            log::debug!("GC requested ({:?})", reason);
            return self.monitor.request_collection();
        }
        self.monitor.requested_epoch()
    }

    pub fn is_requested(&self) -> bool {
        self.request_flag.load(Ordering::Relaxed)
    }

    /// The reason of the pending (or running) GC.
    pub fn reason(&self) -> TriggerReason {
        self.reason.load(Ordering::Relaxed)
    }

    /// Let mutators request the next GC. Called once every mutator has stopped.
    pub fn clear_request(&self) {
        let _guard = self.request_sync.lock().unwrap();
        self.request_flag.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_requests_share_a_gc() {
        let monitor = Arc::new(SafepointMonitor::new());
        let requester = GCRequester::new(monitor.clone());
        let first = requester.request(TriggerReason::Resource);
        let second = requester.request(TriggerReason::External);
        assert_eq!(first, second);
        assert_eq!(requester.reason(), TriggerReason::Resource);
        requester.clear_request();
        assert!(!requester.is_requested());
    }
}

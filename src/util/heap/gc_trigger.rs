use std::sync::atomic::{AtomicUsize, Ordering};

use crate::plan::{Plan, TriggerReason};
use crate::policy::space::Space;
use crate::util::constants::LOG_BYTES_IN_PAGE;
use crate::util::log;
use crate::util::options::{GCTriggerSelector, Options};
use crate::vm::VMBinding;

/// GCTrigger is responsible for triggering GCs based on the given policy.
/// All the decisions about heap limit and GC triggering are resolved here.
pub struct GCTrigger<VM: VMBinding> {
    /// The current plan. Set once the plan has a fixed address.
    plan: spin::Once<&'static dyn Plan<VM = VM>>,
    /// The triggering policy.
    pub policy: Box<dyn GCTriggerPolicy<VM>>,
}

impl<VM: VMBinding> GCTrigger<VM> {
    pub fn new(options: &Options) -> Self {
        GCTrigger {
            plan: spin::Once::new(),
            policy: match options.gc_trigger {
                GCTriggerSelector::FixedHeapSize(size) => Box::new(FixedHeapSizeTrigger {
                    total_pages: size >> LOG_BYTES_IN_PAGE,
                }),
                GCTriggerSelector::DynamicHeapSize(min, max) => Box::new(LiveRatioTrigger::new(
                    min >> LOG_BYTES_IN_PAGE,
                    max >> LOG_BYTES_IN_PAGE,
                )),
            },
        }
    }

    /// Set the plan. Called once the collector instance is leaked.
    pub fn set_plan(&self, plan: &'static dyn Plan<VM = VM>) {
        self.plan.call_once(|| plan);
    }

    fn plan(&self) -> &'static dyn Plan<VM = VM> {
        *self.plan.get().expect("GC trigger used before the plan is set")
    }

    /// Called by the allocation subsystem each time pages are consumed.
    /// Returns true if a GC was requested.
    ///
    /// Arguments:
    /// * `space_full`: the space request failed, pages must be recovered within `space`.
    /// * `space`: the space that triggered the poll, if any.
    pub fn poll(&self, space_full: bool, space: Option<&dyn Space<VM>>) -> bool {
        let plan = self.plan();
        if self.policy.is_gc_required(space_full, space, plan) {
            log::info!(
                "[POLL] {}{}",
                if let Some(space) = space {
                    format!("{}: ", space.get_name())
                } else {
                    "".to_string()
                },
                "Triggering collection"
            );
            plan.base().gc_requester.request(TriggerReason::Resource);
            return true;
        }
        log::trace!("[POLL] no GC needed");
        false
    }

    /// Is the heap full?
    pub fn is_heap_full(&self) -> bool {
        self.policy.is_heap_full(self.plan())
    }

    pub fn get_heap_size_in_pages(&self) -> usize {
        self.policy.get_heap_size_in_pages()
    }

    pub fn on_gc_start(&self) {
        self.policy.on_gc_start(self.plan());
    }

    pub fn on_gc_end(&self) {
        self.policy.on_gc_end(self.plan());
    }
}

/// A GC trigger policy decides the current heap limit and whether a GC is needed.
/// It is told when GCs start and end so it can adapt the limit.
pub trait GCTriggerPolicy<VM: VMBinding>: Sync + Send {
    /// Inform the triggering policy that a GC starts.
    fn on_gc_start(&self, _plan: &dyn Plan<VM = VM>) {}
    /// Inform the triggering policy that a GC ends.
    fn on_gc_end(&self, _plan: &dyn Plan<VM = VM>) {}
    /// Is a GC required now?
    fn is_gc_required(&self, space_full: bool, space: Option<&dyn Space<VM>>, plan: &dyn Plan<VM = VM>) -> bool {
        // Let the plan decide
        plan.collection_required(space_full, space)
    }
    /// Is the heap full?
    fn is_heap_full(&self, plan: &dyn Plan<VM = VM>) -> bool {
        plan.get_reserved_pages() > self.get_heap_size_in_pages()
    }
    /// The current heap size in pages.
    fn get_heap_size_in_pages(&self) -> usize;
    /// Can the heap size grow?
    fn can_heap_size_grow(&self) -> bool;
}

/// A simple GC trigger that uses a fixed heap size.
pub struct FixedHeapSizeTrigger {
    total_pages: usize,
}

impl<VM: VMBinding> GCTriggerPolicy<VM> for FixedHeapSizeTrigger {
    fn get_heap_size_in_pages(&self) -> usize {
        self.total_pages
    }

    fn can_heap_size_grow(&self) -> bool {
        false
    }
}

/// Moves the heap limit between a minimum and a maximum: after each GC the
/// limit becomes twice the live pages, clamped to the bounds.
pub struct LiveRatioTrigger {
    min_heap_pages: usize,
    max_heap_pages: usize,
    current_heap_pages: AtomicUsize,
}

impl LiveRatioTrigger {
    const LIVE_RATIO: usize = 2;

    fn new(min_heap_pages: usize, max_heap_pages: usize) -> Self {
        Self {
            min_heap_pages,
            max_heap_pages,
            // start with min heap
            current_heap_pages: AtomicUsize::new(min_heap_pages),
        }
    }

    fn compute_new_heap_limit(&self, live: usize, extra_reserve: usize) -> usize {
        let optimal = live * Self::LIVE_RATIO + extra_reserve;
        let new_heap = optimal.clamp(self.min_heap_pages, self.max_heap_pages);
        log::debug!(
            "New heap limit = {} pages (live = {}, clamped to [{}, {}])",
            new_heap,
            live,
            self.min_heap_pages,
            self.max_heap_pages
        );
        self.current_heap_pages.store(new_heap, Ordering::Relaxed);
        new_heap
    }
}

impl<VM: VMBinding> GCTriggerPolicy<VM> for LiveRatioTrigger {
    fn on_gc_end(&self, plan: &dyn Plan<VM = VM>) {
        // Nursery GCs say little about the live size of the whole heap.
        if plan.is_current_gc_nursery() {
            return;
        }
        self.compute_new_heap_limit(plan.get_used_pages(), plan.get_collection_reserved_pages());
    }

    fn get_heap_size_in_pages(&self) -> usize {
        self.current_heap_pages.load(Ordering::Relaxed)
    }

    fn can_heap_size_grow(&self) -> bool {
        self.current_heap_pages.load(Ordering::Relaxed) < self.max_heap_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_ratio_is_clamped() {
        let trigger = LiveRatioTrigger::new(100, 1000);
        assert_eq!(trigger.compute_new_heap_limit(10, 0), 100);
        assert_eq!(trigger.compute_new_heap_limit(200, 10), 410);
        assert_eq!(trigger.compute_new_heap_limit(900, 0), 1000);
        assert_eq!(trigger.current_heap_pages.load(Ordering::Relaxed), 1000);
    }
}

use super::counter::{Counter, EventCounter, Timer};
use crate::plan::TriggerReason;
use crate::util::log;
use enum_map::EnumMap;
use itertools::Itertools;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Collector statistics. Counters are updated by any thread; per-GC values
/// are reset when each GC starts.
pub struct Stats {
    gc_count: AtomicUsize,
    gathering_stats: AtomicBool,
    pub gc_time: Timer,
    /// Decrement processing.
    pub dec_time: Timer,
    /// Root and mod buffer processing.
    pub inc_time: Timer,
    pub cycle_time: Timer,
    pub barrier_slow_path: EventCounter,
    pub incs: EventCounter,
    pub decs: EventCounter,
    pub roots: EventCounter,
    pub purple: EventCounter,
    pub freed: EventCounter,
    reasons: EnumMap<TriggerReason, AtomicUsize>,
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            gc_count: AtomicUsize::new(0),
            gathering_stats: AtomicBool::new(false),
            gc_time: Timer::new("time.gc"),
            dec_time: Timer::new("time.dec"),
            inc_time: Timer::new("time.inc"),
            cycle_time: Timer::new("time.cycle"),
            barrier_slow_path: EventCounter::new("barrier.slow"),
            incs: EventCounter::new("rc.incs"),
            decs: EventCounter::new("rc.decs"),
            roots: EventCounter::new("rc.roots"),
            purple: EventCounter::new("rc.purple"),
            freed: EventCounter::new("rc.freed"),
            reasons: EnumMap::default(),
        }
    }

    fn per_gc_counters(&self) -> [&EventCounter; 5] {
        [&self.incs, &self.decs, &self.roots, &self.purple, &self.freed]
    }

    pub fn start_gc(&self, reason: TriggerReason) {
        self.gc_count.fetch_add(1, Ordering::SeqCst);
        self.reasons[reason].fetch_add(1, Ordering::Relaxed);
        for c in self.per_gc_counters() {
            c.start();
        }
        self.gc_time.start();
    }

    pub fn end_gc(&self) {
        self.gc_time.stop();
        for c in self.per_gc_counters() {
            c.stop();
        }
    }

    pub fn gc_count(&self) -> usize {
        self.gc_count.load(Ordering::SeqCst)
    }

    pub fn triggered_by(&self, reason: TriggerReason) -> usize {
        self.reasons[reason].load(Ordering::Relaxed)
    }

    /// One line summary of the per-GC counters of the last GC.
    pub fn last_gc_summary(&self) -> String {
        self.per_gc_counters()
            .iter()
            .map(|c| format!("{}={}", c.name(), c.last()))
            .join(" ")
    }

    pub fn start_all(&self) {
        if self.gathering_stats.swap(true, Ordering::SeqCst) {
            log::warn!("Statistics are already being gathered. The harness may have been started twice.");
        }
    }

    pub fn stop_all(&self) {
        self.gathering_stats.store(false, Ordering::SeqCst);
        self.print_stats();
    }

    pub fn get_gathering_stats(&self) -> bool {
        self.gathering_stats.load(Ordering::SeqCst)
    }

    fn columns(&self) -> Vec<(String, String)> {
        let mut columns = vec![("GC".to_string(), self.gc_count().to_string())];
        for t in [&self.gc_time, &self.dec_time, &self.inc_time, &self.cycle_time] {
            columns.push((t.name().to_string(), t.print_total()));
        }
        for c in [&self.barrier_slow_path, &self.incs, &self.decs, &self.roots, &self.purple, &self.freed] {
            columns.push((c.name().to_string(), c.print_total()));
        }
        for (reason, count) in self.reasons.iter() {
            columns.push((format!("trigger.{:?}", reason), count.load(Ordering::Relaxed).to_string()));
        }
        columns
    }

    pub fn print_stats(&self) {
        let columns = self.columns();
        println!("============================ Ulterior GC Statistics Totals ============================");
        println!("{}", columns.iter().map(|(name, _)| name).join("\t"));
        println!("{}", columns.iter().map(|(_, value)| value).join("\t"));
        println!("Total time: {:.2} ms", self.gc_time.total_millis());
        println!("------------------------------ End Ulterior GC Statistics -----------------------------");
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

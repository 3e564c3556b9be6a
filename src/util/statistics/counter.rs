use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// A named statistic that can be started and stopped around GCs.
pub trait Counter {
    fn name(&self) -> &str;
    /// Begin counting for a new GC. Values counted so far stay in the total.
    fn start(&self);
    fn stop(&self);
    /// The value of the current (or last) GC.
    fn last(&self) -> u64;
    fn total(&self) -> u64;
    /// Print the total, formatted for this counter.
    fn print_total(&self) -> String;
}

/// Counts events. Counting can happen from any thread.
pub struct EventCounter {
    name: &'static str,
    running: AtomicBool,
    current: AtomicU64,
    total: AtomicU64,
}

impl EventCounter {
    pub const fn new(name: &'static str) -> Self {
        EventCounter {
            name,
            running: AtomicBool::new(false),
            current: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, value: u64) {
        self.current.fetch_add(value, Ordering::Relaxed);
        self.total.fetch_add(value, Ordering::Relaxed);
    }
}

impl Counter for EventCounter {
    fn name(&self) -> &str {
        self.name
    }

    fn start(&self) {
        self.running.store(true, Ordering::Relaxed);
        self.current.store(0, Ordering::Relaxed);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    fn last(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    fn print_total(&self) -> String {
        format!("{}", self.total())
    }
}

/// Accumulates wall-clock time in nanoseconds.
pub struct Timer {
    name: &'static str,
    started: Mutex<Option<Instant>>,
    last: AtomicU64,
    total: AtomicU64,
}

impl Timer {
    pub const fn new(name: &'static str) -> Self {
        Timer {
            name,
            started: Mutex::new(None),
            last: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Time `f`.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        self.start();
        let result = f();
        self.stop();
        result
    }

    /// Total time in milliseconds.
    pub fn total_millis(&self) -> f64 {
        self.total() as f64 / 1e6
    }
}

impl Counter for Timer {
    fn name(&self) -> &str {
        self.name
    }

    fn start(&self) {
        let mut started = self.started.lock().unwrap();
        debug_assert!(started.is_none(), "Timer {} started twice", self.name);
        *started = Some(Instant::now());
    }

    fn stop(&self) {
        if let Some(start) = self.started.lock().unwrap().take() {
            let nanos = start.elapsed().as_nanos() as u64;
            self.last.store(nanos, Ordering::Relaxed);
            self.total.fetch_add(nanos, Ordering::Relaxed);
        }
    }

    fn last(&self) -> u64 {
        self.last.load(Ordering::Relaxed)
    }

    fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    fn print_total(&self) -> String {
        format!("{:.2}", self.total_millis())
    }
}

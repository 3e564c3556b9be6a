//! Collector threads and their synchronization with mutators.

mod collector;
pub use collector::CollectorContext;
pub use collector::RcLocal;

mod rendezvous;
pub use rendezvous::Rendezvous;

mod safepoint;
pub use safepoint::SafepointMonitor;

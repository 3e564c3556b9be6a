pub mod counter;
pub mod stats;

pub use self::counter::{Counter, EventCounter, Timer};
pub use self::stats::Stats;

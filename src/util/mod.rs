//! Utilities used by the rest of the collector: addresses and constants,
//! the simulated heap, allocators, work deques and statistics.

// Allocation
/// Allocators.
pub mod alloc;

/// Copying objects during a collection.
pub mod copy;
/// Heap layout and page resources.
pub mod heap;
/// The collector's part of the object header.
pub mod header;
/// Options for the collector.
pub mod options;

// Public but not meant for bindings.
/// Constants used in the collector.
pub mod constants;
/// Conversion between bytes, pages, chunks, and alignment.
pub mod conversions;
/// Wrappers of the logging macros.
pub(crate) mod log;
/// Logger initialization.
pub mod logger;
/// The arena objects live in.
pub mod memory;
/// Forwarding state of copied objects.
pub mod object_forwarding;
/// Statistics for the collector.
pub mod statistics;
/// Chunked work deques.
pub mod deque;
/// Test utilities.
#[cfg(any(test, feature = "test_private"))]
pub mod test_util;

pub(crate) mod freelist;
pub(crate) mod live_bitmap;
pub(crate) mod reference_processor;
pub(crate) mod treadmill;

mod address;
pub mod opaque_pointer;

pub use self::address::Address;
pub use self::address::ObjectReference;
pub use self::opaque_pointer::*;

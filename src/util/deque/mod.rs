//! Chunked work queues of object references.
//!
//! A [`SharedDeque`] is a list of full chunks shared by all threads. Each
//! thread pushes into and pops from a private [`LocalDeque`], which only
//! touches the shared list when a chunk fills up or runs dry. All chunks come
//! from one [`MetaDataPool`], whose size feeds the GC trigger.

mod local;
mod pool;
mod shared;

pub use self::local::LocalDeque;
pub use self::pool::{Chunk, MetaDataPool, CHUNK_ENTRIES};
pub use self::shared::SharedDeque;

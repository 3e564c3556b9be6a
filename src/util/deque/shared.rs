use super::pool::{Chunk, MetaDataPool};
use crate::util::log;
use std::sync::{Arc, Condvar, Mutex};

struct SharedDequeSync {
    chunks: Vec<Chunk>,
    /// Number of threads that will consume this deque in the current phase.
    consumers: usize,
    /// Consumers blocked in `pop_chunk`.
    waiting: usize,
    /// Every consumer ran dry at the same time. Set until the next `prepare`.
    complete: bool,
}

/// A named list of chunks shared by producers and consumers.
///
/// Consumers that find the list empty block in [`SharedDeque::pop_chunk`]
/// until either a chunk shows up or every consumer registered with
/// [`SharedDeque::prepare`] is blocked, which means the phase's work is done.
pub struct SharedDeque {
    name: &'static str,
    pool: Arc<MetaDataPool>,
    sync: Mutex<SharedDequeSync>,
    monitor: Condvar,
}

impl SharedDeque {
    pub fn new(name: &'static str, pool: Arc<MetaDataPool>) -> Self {
        SharedDeque {
            name,
            pool,
            sync: Mutex::new(SharedDequeSync {
                chunks: vec![],
                consumers: 0,
                waiting: 0,
                complete: false,
            }),
            monitor: Condvar::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pool(&self) -> &Arc<MetaDataPool> {
        &self.pool
    }

    /// Start a consuming phase with `consumers` threads.
    pub fn prepare(&self, consumers: usize) {
        let mut sync = self.sync.lock().unwrap();
        debug_assert_eq!(sync.waiting, 0, "{}: prepared while consumers are waiting", self.name);
        sync.consumers = consumers;
        sync.complete = consumers == 0;
    }

    pub fn push_chunk(&self, chunk: Chunk) {
        if chunk.is_empty() {
            self.pool.free_chunk(chunk);
            return;
        }
        let mut sync = self.sync.lock().unwrap();
        sync.chunks.push(chunk);
        if sync.waiting > 0 {
            self.monitor.notify_one();
        }
    }

    /// Take a chunk, blocking while other consumers may still produce work.
    /// Returns `None` once the phase is complete.
    pub fn pop_chunk(&self) -> Option<Chunk> {
        let mut sync = self.sync.lock().unwrap();
        loop {
            if let Some(chunk) = sync.chunks.pop() {
                return Some(chunk);
            }
            if sync.complete {
                return None;
            }
            if sync.waiting + 1 >= sync.consumers {
                log::trace!("{}: all {} consumers are idle", self.name, sync.consumers);
                sync.complete = true;
                self.monitor.notify_all();
                return None;
            }
            sync.waiting += 1;
            sync = self.monitor.wait(sync).unwrap();
            sync.waiting -= 1;
        }
    }

    /// Take a chunk if one is available. Never blocks.
    pub fn try_pop_chunk(&self) -> Option<Chunk> {
        self.sync.lock().unwrap().chunks.pop()
    }

    /// Stop consuming before the phase is complete. The remaining work stays
    /// in the deque.
    pub fn leave(&self) {
        let mut sync = self.sync.lock().unwrap();
        debug_assert!(sync.consumers > 0);
        sync.consumers -= 1;
        if sync.consumers == 0 || sync.waiting >= sync.consumers {
            sync.complete = true;
            self.monitor.notify_all();
        }
    }

    /// The number of entries in shared chunks.
    pub fn entries(&self) -> usize {
        self.sync.lock().unwrap().chunks.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sync.lock().unwrap().chunks.is_empty()
    }

    /// Drop every entry and give the chunks back to the pool.
    pub fn reset(&self) {
        let chunks = std::mem::take(&mut self.sync.lock().unwrap().chunks);
        for chunk in chunks {
            self.pool.free_chunk(chunk);
        }
    }
}

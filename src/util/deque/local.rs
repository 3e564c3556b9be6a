use super::pool::{Chunk, CHUNK_ENTRIES};
use super::shared::SharedDeque;
use crate::util::ObjectReference;
use std::sync::Arc;

/// A thread-private view of a [`SharedDeque`]. Pushes fill a private chunk
/// that is handed to the shared deque when full. Pops drain private chunks
/// first and only then take a chunk from the shared deque.
pub struct LocalDeque {
    shared: Arc<SharedDeque>,
    head: Chunk,
    tail: Chunk,
}

impl LocalDeque {
    pub fn new(shared: Arc<SharedDeque>) -> Self {
        LocalDeque {
            shared,
            head: Vec::new(),
            tail: Vec::new(),
        }
    }

    pub fn shared(&self) -> &Arc<SharedDeque> {
        &self.shared
    }

    pub fn push(&mut self, object: ObjectReference) {
        if self.tail.capacity() == 0 {
            self.tail = self.shared.pool().alloc_chunk();
        } else if self.tail.len() >= CHUNK_ENTRIES {
            let full = std::mem::replace(&mut self.tail, self.shared.pool().alloc_chunk());
            self.shared.push_chunk(full);
        }
        self.tail.push(object);
    }

    fn pop_local(&mut self) -> Option<ObjectReference> {
        if let Some(object) = self.head.pop() {
            return Some(object);
        }
        self.tail.pop()
    }

    fn take_head(&mut self, chunk: Chunk) {
        let old = std::mem::replace(&mut self.head, chunk);
        self.shared.pool().free_chunk(old);
    }

    /// Pop an entry. Blocks on the shared deque when the private chunks are
    /// empty. `None` means the shared deque's phase is complete.
    pub fn pop(&mut self) -> Option<ObjectReference> {
        loop {
            if let Some(object) = self.pop_local() {
                return Some(object);
            }
            let chunk = self.shared.pop_chunk()?;
            self.take_head(chunk);
        }
    }

    /// Pop an entry without ever blocking. `None` means there is nothing left
    /// right now.
    pub fn try_pop(&mut self) -> Option<ObjectReference> {
        loop {
            if let Some(object) = self.pop_local() {
                return Some(object);
            }
            let chunk = self.shared.try_pop_chunk()?;
            self.take_head(chunk);
        }
    }

    /// Hand every private entry to the shared deque.
    pub fn flush(&mut self) {
        let head = std::mem::take(&mut self.head);
        let tail = std::mem::take(&mut self.tail);
        self.shared.push_chunk(head);
        self.shared.push_chunk(tail);
    }

    /// Are the private chunks empty?
    pub fn is_locally_empty(&self) -> bool {
        self.head.is_empty() && self.tail.is_empty()
    }

    /// Drop the private entries.
    pub fn reset(&mut self) {
        let head = std::mem::take(&mut self.head);
        let tail = std::mem::take(&mut self.tail);
        self.shared.pool().free_chunk(head);
        self.shared.pool().free_chunk(tail);
    }
}

impl Drop for LocalDeque {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::deque::MetaDataPool;
    use crate::util::Address;

    fn obj(i: usize) -> ObjectReference {
        ObjectReference::from_raw_address(Address::from_usize(0x4000_0000 + i * 16)).unwrap()
    }

    #[test]
    fn overflow_goes_to_shared() {
        let shared = Arc::new(SharedDeque::new("test", Arc::new(MetaDataPool::new())));
        let mut local = LocalDeque::new(shared.clone());
        for i in 1..=CHUNK_ENTRIES + 1 {
            local.push(obj(i));
        }
        assert_eq!(shared.entries(), CHUNK_ENTRIES);
        local.flush();
        assert_eq!(shared.entries(), CHUNK_ENTRIES + 1);
        assert!(local.is_locally_empty());
    }

    #[test]
    fn pop_drains_everything_once() {
        let shared = Arc::new(SharedDeque::new("test", Arc::new(MetaDataPool::new())));
        let mut producer = LocalDeque::new(shared.clone());
        for i in 1..=1000 {
            producer.push(obj(i));
        }
        producer.flush();
        shared.prepare(1);
        let mut consumer = LocalDeque::new(shared.clone());
        let mut seen = std::collections::HashSet::new();
        while let Some(o) = consumer.pop() {
            assert!(seen.insert(o));
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn try_pop_does_not_block() {
        let shared = Arc::new(SharedDeque::new("test", Arc::new(MetaDataPool::new())));
        shared.prepare(2);
        let mut local = LocalDeque::new(shared);
        assert!(local.try_pop().is_none());
        local.push(obj(7));
        assert_eq!(local.try_pop(), Some(obj(7)));
    }
}

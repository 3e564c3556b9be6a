use std::collections::HashSet;
use std::mem::swap;
use std::sync::Mutex;

use crate::util::ObjectReference;

/// The set of large objects, split into the objects that survived (or were
/// allocated since) the last trace and the objects the current trace has not
/// reached yet.
pub struct TreadMill {
    from_space: Mutex<HashSet<ObjectReference>>,
    to_space: Mutex<HashSet<ObjectReference>>,
}

impl std::fmt::Debug for TreadMill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreadMill")
            .field("from", &self.from_space.lock().unwrap().len())
            .field("to", &self.to_space.lock().unwrap().len())
            .finish()
    }
}

impl TreadMill {
    pub fn new() -> Self {
        TreadMill {
            from_space: Mutex::new(HashSet::new()),
            to_space: Mutex::new(HashSet::new()),
        }
    }

    /// Record a new object. It is live until the next trace.
    pub fn add_to_treadmill(&self, object: ObjectReference) {
        self.to_space.lock().unwrap().insert(object);
    }

    /// Move a reached object to the to-space. Returns false if it was already there.
    pub fn copy(&self, object: ObjectReference) -> bool {
        let removed = self.from_space.lock().unwrap().remove(&object);
        if removed {
            self.to_space.lock().unwrap().insert(object);
        }
        removed
    }

    /// Forget an object that is freed explicitly.
    pub fn remove(&self, object: ObjectReference) -> bool {
        self.to_space.lock().unwrap().remove(&object) || self.from_space.lock().unwrap().remove(&object)
    }

    pub fn contains(&self, object: ObjectReference) -> bool {
        self.to_space.lock().unwrap().contains(&object) || self.from_space.lock().unwrap().contains(&object)
    }

    /// Take every object the trace did not reach.
    pub fn collect(&self) -> Vec<ObjectReference> {
        self.from_space.lock().unwrap().drain().collect()
    }

    pub fn to_space_len(&self) -> usize {
        self.to_space.lock().unwrap().len()
    }

    pub fn from_space_empty(&self) -> bool {
        self.from_space.lock().unwrap().is_empty()
    }

    /// Start a trace: every known object becomes unreached.
    pub fn flip(&self) {
        let mut from = self.from_space.lock().unwrap();
        let mut to = self.to_space.lock().unwrap();
        debug_assert!(from.is_empty(), "Unswept objects left from the last trace");
        swap(&mut *from, &mut *to);
    }

    /// Every object, reached or not.
    pub fn objects(&self) -> Vec<ObjectReference> {
        let mut all: Vec<ObjectReference> = self.to_space.lock().unwrap().iter().copied().collect();
        all.extend(self.from_space.lock().unwrap().iter().copied());
        all
    }
}

impl Default for TreadMill {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Address;

    fn obj(i: usize) -> ObjectReference {
        ObjectReference::from_raw_address(Address::from_usize(0x4000_0000 + i * 4096)).unwrap()
    }

    #[test]
    fn unreached_objects_are_collected() {
        let tm = TreadMill::new();
        tm.add_to_treadmill(obj(1));
        tm.add_to_treadmill(obj(2));
        tm.flip();
        assert!(tm.copy(obj(1)));
        assert!(!tm.copy(obj(1)));
        assert_eq!(tm.collect(), vec![obj(2)]);
        assert!(tm.contains(obj(1)));
        assert!(!tm.contains(obj(2)));
    }

    #[test]
    fn remove_from_either_side() {
        let tm = TreadMill::new();
        tm.add_to_treadmill(obj(1));
        tm.flip();
        tm.add_to_treadmill(obj(2));
        assert!(tm.remove(obj(1)));
        assert!(tm.remove(obj(2)));
        assert!(!tm.remove(obj(2)));
        assert_eq!(tm.objects().len(), 0);
    }
}

//! A free list of units (pages, for our page resources). Free extents are
//! kept ordered by their first unit, allocation is first fit, and freeing
//! an extent coalesces it with free neighbours.

use std::collections::{BTreeMap, HashMap};

pub struct FreeList {
    /// First unit -> length of each free extent.
    free: BTreeMap<usize, usize>,
    /// First unit -> length of each allocated extent.
    allocated: HashMap<usize, usize>,
    units: usize,
}

impl FreeList {
    /// A free list over `units` units, all free.
    pub fn new(units: usize) -> Self {
        let mut free = BTreeMap::new();
        if units > 0 {
            free.insert(0, units);
        }
        FreeList {
            free,
            allocated: HashMap::new(),
            units,
        }
    }

    /// Allocate `size` contiguous units. Returns the first unit.
    pub fn alloc(&mut self, size: usize) -> Option<usize> {
        debug_assert!(size > 0);
        let (&start, &len) = self.free.iter().find(|(_, len)| **len >= size)?;
        self.free.remove(&start);
        if len > size {
            self.free.insert(start + size, len - size);
        }
        self.allocated.insert(start, size);
        Some(start)
    }

    /// Free the extent starting at `unit`. Returns the number of units freed.
    pub fn free(&mut self, unit: usize) -> usize {
        let size = self
            .allocated
            .remove(&unit)
            .unwrap_or_else(|| panic!("Freeing unit {} which is not the start of an allocated extent", unit));
        let mut start = unit;
        let mut len = size;
        // Merge with the previous free extent if it ends where we start.
        if let Some((&prev_start, &prev_len)) = self.free.range(..unit).next_back() {
            if prev_start + prev_len == unit {
                self.free.remove(&prev_start);
                start = prev_start;
                len += prev_len;
            }
        }
        // Merge with the next free extent if it starts where we end.
        if let Some(next_len) = self.free.remove(&(unit + size)) {
            len += next_len;
        }
        self.free.insert(start, len);
        size
    }

    /// The size of the allocated extent starting at `unit`.
    pub fn size(&self, unit: usize) -> Option<usize> {
        self.allocated.get(&unit).copied()
    }

    pub fn free_units(&self) -> usize {
        self.free.values().sum()
    }

    pub fn total_units(&self) -> usize {
        self.units
    }

    /// Free everything.
    pub fn reset(&mut self) {
        *self = FreeList::new(self.units);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit() {
        let mut l = FreeList::new(8);
        assert_eq!(l.alloc(2), Some(0));
        assert_eq!(l.alloc(3), Some(2));
        assert_eq!(l.alloc(4), None);
        assert_eq!(l.alloc(3), Some(5));
        assert_eq!(l.free_units(), 0);
    }

    #[test]
    fn free_coalesces() {
        let mut l = FreeList::new(8);
        let a = l.alloc(2).unwrap();
        let b = l.alloc(2).unwrap();
        let c = l.alloc(2).unwrap();
        assert_eq!(l.free(a), 2);
        assert_eq!(l.free(c), 2);
        // Not contiguous yet.
        assert_eq!(l.alloc(5), None);
        assert_eq!(l.free(b), 2);
        // Everything merged back into one extent.
        assert_eq!(l.alloc(8), Some(0));
    }

    #[test]
    fn reuse_after_free() {
        let mut l = FreeList::new(4);
        let a = l.alloc(1).unwrap();
        let _b = l.alloc(3).unwrap();
        l.free(a);
        assert_eq!(l.alloc(1), Some(a));
        assert_eq!(l.size(a), Some(1));
    }

    #[test]
    #[should_panic]
    fn double_free_panics() {
        let mut l = FreeList::new(4);
        let a = l.alloc(1).unwrap();
        l.free(a);
        l.free(a);
    }
}

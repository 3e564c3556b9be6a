use crate::util::constants::{BYTES_IN_CHUNK, HEAP_START};
use crate::util::conversions::raw_chunk_align_up;
use crate::util::Address;

/// The placement of one space in the heap arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpaceMeta {
    pub name: &'static str,
    pub start: Address,
    /// The size of the extent in bytes. Always a multiple of chunks.
    pub extent: usize,
}

/// Decides where each space lives while a plan is created. Spaces are laid
/// out from [`HEAP_START`] upwards in the order they are specified, each in
/// its own chunk-aligned extent. The arena is created once every space has
/// been specified.
pub struct HeapMeta {
    heap_cursor: Address,
    entries: Vec<SpaceMeta>,
}

impl HeapMeta {
    pub fn new() -> Self {
        HeapMeta {
            heap_cursor: HEAP_START,
            entries: vec![],
        }
    }

    /// Reserve an extent of at least `bytes` for the space `name`.
    pub fn specify_space(&mut self, name: &'static str, bytes: usize) -> SpaceMeta {
        debug_assert!(
            self.entries.iter().all(|e| e.name != name),
            "Space {} is specified twice",
            name
        );
        let extent = raw_chunk_align_up(bytes.max(BYTES_IN_CHUNK));
        let meta = SpaceMeta {
            name,
            start: self.heap_cursor,
            extent,
        };
        self.heap_cursor += extent;
        self.entries.push(meta);
        meta
    }

    /// The placement of a specified space.
    pub fn get_space_meta(&self, name: &str) -> Option<SpaceMeta> {
        self.entries.iter().find(|e| e.name == name).copied()
    }

    pub fn heap_start(&self) -> Address {
        HEAP_START
    }

    pub fn heap_end(&self) -> Address {
        self.heap_cursor
    }

    /// Bytes needed for every space specified so far.
    pub fn total_bytes(&self) -> usize {
        self.heap_cursor - HEAP_START
    }
}

impl Default for HeapMeta {
    fn default() -> Self {
        Self::new()
    }
}

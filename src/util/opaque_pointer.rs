use crate::util::Address;

/// A handle the runtime gives the collector to name one of its threads. The
/// collector stores it and hands it back through the [`crate::vm`] traits, but
/// never interprets it.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct OpaquePointer(usize);

impl OpaquePointer {
    /// Represents an uninitialized value for [`OpaquePointer`].
    pub const UNINITIALIZED: Self = Self(0);

    pub const fn from_usize(raw: usize) -> Self {
        OpaquePointer(raw)
    }

    pub const fn as_usize(self) -> usize {
        self.0
    }

    pub const fn from_address(addr: Address) -> Self {
        OpaquePointer(addr.as_usize())
    }

    pub const fn to_address(self) -> Address {
        Address::from_usize(self.0)
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Identifies any runtime thread.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct VMThread(pub OpaquePointer);

impl VMThread {
    /// Represents an uninitialized value for [`VMThread`].
    pub const UNINITIALIZED: Self = Self(OpaquePointer::UNINITIALIZED);

    pub const fn from_usize(raw: usize) -> Self {
        VMThread(OpaquePointer::from_usize(raw))
    }
}

/// A thread that owns a [`crate::Mutator`] and allocates through it.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct VMMutatorThread(pub VMThread);

/// A thread that runs a [`crate::scheduler::CollectorContext`].
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct VMWorkerThread(pub VMThread);

//! The interface between the collector and the runtime that embeds it.
//!
//! A runtime implements [`VMBinding`] and the traits it names. The collector
//! never knows how an object is laid out beyond its GC header: object sizes,
//! outgoing references and roots all come through these traits.

mod collection;
mod object_model;
mod reference_glue;
mod scanning;

pub use self::collection::Collection;
pub use self::collection::GCThreadContext;
pub use self::object_model::ObjectModel;
pub use self::reference_glue::ReferenceGlue;
pub use self::scanning::RootVisitor;
pub use self::scanning::Scanning;
pub use self::scanning::SlotVisitor;

/// Default min alignment 8 bytes
const DEFAULT_LOG_MIN_ALIGNMENT: usize = 3;
/// Default max alignment 16 bytes
const DEFAULT_LOG_MAX_ALIGNMENT: usize = 4;

/// The `VMBinding` trait associates with each trait, and provides VM-specific constants.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync + Default,
{
    type VMObjectModel: ObjectModel<Self>;
    type VMScanning: Scanning<Self>;
    type VMCollection: Collection<Self>;
    type VMReferenceGlue: ReferenceGlue<Self>;

    /// Allowed minimal alignment in bytes.
    const MIN_ALIGNMENT: usize = 1 << DEFAULT_LOG_MIN_ALIGNMENT;
    /// Allowed maximum alignment in bytes.
    const MAX_ALIGNMENT: usize = 1 << DEFAULT_LOG_MAX_ALIGNMENT;
}

#[cfg(test)]
mod tests;

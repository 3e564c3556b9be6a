mod accounting;
pub mod freelistpageresource;
pub mod gc_trigger;
mod heap_meta;
pub mod monotonepageresource;
pub mod pageresource;

pub use self::accounting::PageAccounting;
pub use self::freelistpageresource::FreeListPageResource;
pub use self::gc_trigger::GCTrigger;
pub use self::heap_meta::{HeapMeta, SpaceMeta};
pub use self::monotonepageresource::MonotonePageResource;
pub use self::pageresource::PageResource;

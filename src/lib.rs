// Allow this for now. Clippy suggests we should use Sft, Mmtk, rather than SFT and MMTK.
// According to its documentation (https://rust-lang.github.io/rust-clippy/master/index.html#upper_case_acronyms),
// with upper-case-acronyms-aggressive turned on, it should also warn us about SFTMap, VMBinding, GCWorker.
// However, it seems clippy does not catch all these patterns at the moment. So it would be hard for us to
// find all the patterns and consistently change all of them. I think it would be a reasonable choice to
// just allow upper case acronyms for now.
#![allow(clippy::upper_case_acronyms)]

//! Ulterior is a memory management core for language runtimes. It offers a
//! small set of stop-the-world collectors that share one set of building
//! blocks:
//! * GenCopy, a generational copying collector,
//! * MarkSweep, a non-moving mark-sweep collector,
//! * GenRC, ulterior reference counting: a copying nursery in front of a
//!   reference counted mature space with deferred, coalesced counts and
//!   trial-deletion cycle collection,
//! * RefCount, the same reference counting without a nursery.
//!
//! A runtime embeds the collector by implementing [`vm::VMBinding`] and
//! talking to it through [`memory_manager`]:
//!
//! ```ignore
//! let builder = MMTKBuilder::new();
//! let mmtk: &'static MMTK<MyVM> = Box::leak(memory_manager::mmtk_init(&builder));
//! memory_manager::initialize_collection(mmtk, tls);
//! let mut mutator = memory_manager::bind_mutator(mmtk, mutator_tls);
//! let addr = memory_manager::alloc(&mut mutator, 32, 8, 0, AllocationSemantics::Default);
//! ```
//!
//! Objects live in a heap arena owned by the collector
//! ([`util::memory::HeapMemory`]); the runtime reads and writes object
//! fields through it, and stores references through
//! [`memory_manager::object_reference_write`] so that the plan's write
//! barrier sees every store.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate downcast_rs;

mod mmtk;
pub use mmtk::MMTKBuilder;
pub use mmtk::MMTK;

mod global_state;
pub use global_state::GlobalState;

pub mod build_info;
pub mod memory_manager;
pub mod plan;
pub mod policy;
pub mod scheduler;
pub mod util;
pub mod vm;

pub use crate::plan::{AllocationHint, AllocationSemantics, BarrierSelector, Mutator, MutatorConfig, Plan};

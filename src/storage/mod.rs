//! Storage Module
//!
//! Persistent storage layer: a set of immutable, key-sorted generation files
//! read through memory mappings.
//!
//! ## Responsibilities
//! - Persist sorted entry batches as new generations (atomic publication)
//! - Point lookups and bounded range cursors, newest generation wins
//! - Compaction of the whole set into one generation, crash-recoverable
//! - Safe teardown of the mappings under concurrent readers
//!
//! ## Directory Layout
//! ```text
//! {data_dir}/
//!   ├── sstable_000000.sst     generation 0 (oldest)
//!   ├── sstable_000001.sst
//!   ├── sstable_00000N.sst     generation N (newest)
//!   ├── *.tmp                  in-progress writes, never read
//!   └── compaction.sst         compaction output awaiting finalize
//! ```
//!
//! The binary layout of a generation file is documented in [`sstable`].

mod entry;
mod manager;
mod scope;

pub mod files;
pub mod merge;
pub mod sstable;

pub use entry::Entry;
pub use manager::Storage;
pub use merge::MergedRange;
pub use sstable::{Generation, GenerationCursor, GenerationMeta, SearchResult};

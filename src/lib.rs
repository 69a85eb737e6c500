//! # GenKV
//!
//! The on-disk sorted-table layer of an embedded key-value engine:
//! - Immutable, key-sorted generation files with a fixed binary format
//! - Zero-copy reads through read-only memory mappings
//! - Binary-search point lookups and bounded range cursors
//! - Crash-safe publication (temp file + atomic rename) and compaction
//! - Idempotent close that is safe under concurrent readers
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Engine (external: memtable, flush policy)      │
//! └───────────┬──────────────────────────────────┬──────────────┘
//!             │ save / compact                   │ get / iterate
//!             ▼                                  ▼
//!   ┌──────────────────┐              ┌──────────────────────┐
//!   │      Writer      │              │  Storage (handle)    │
//!   │ temp + mmap +    │              │  Scope: mappings,    │
//!   │ atomic rename    │              │  closed flag         │
//!   └────────┬─────────┘              └──────────┬───────────┘
//!            │                                   │
//!            ▼                                   ▼
//!   ┌─────────────────────────────────────────────────────────┐
//!   │   sstable_000000.sst … sstable_00000N.sst (oldest → new)│
//!   └─────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{GenKvError, Result};
pub use config::Config;
pub use storage::{Entry, Storage};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of GenKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage, read
//! through a read-only memory mapping.
//!
//! ## File Format
//! All integers are 8-byte signed, native-endian.
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (24 bytes)                                       │
//! │   Version (8) | EntryCount N (8) | HasTombstone 0/1 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Offset Index (N * 8 bytes)                              │
//! │   [EntryOffset] ... one per entry, ascending key order  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Region (variable)                                  │
//! │   [KeyLen][Key][ValLen][Value]                          │
//! │   ... repeated for each entry ...                       │
//! │   (ValLen = -1 means tombstone, no value bytes)         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Offsets in the index are absolute file offsets of the entry's key record.

mod builder;
mod iterator;
mod reader;

pub use builder::{write_generation, GenerationMeta};
pub use iterator::GenerationCursor;
pub use reader::{Generation, SearchResult};

use crate::error::{GenKvError, Result};
use crate::storage::Entry;

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Current file format version
pub const VERSION: i64 = 0;

/// Width of every fixed-size field in the file
pub const FIELD_SIZE: u64 = 8;

/// Header size: Version (8) + EntryCount (8) + HasTombstone (8) = 24 bytes
pub const HEADER_SIZE: u64 = FIELD_SIZE * 3;

/// Size of one offset-index slot
pub const INDEX_RECORD_SIZE: u64 = FIELD_SIZE;

/// Value length recorded for a tombstone (deleted key)
pub const TOMBSTONE_MARKER: i64 = -1;

pub(crate) const VERSION_OFFSET: u64 = 0;
pub(crate) const COUNT_OFFSET: u64 = 8;
pub(crate) const TOMBSTONE_FLAG_OFFSET: u64 = 16;

// =============================================================================
// Header
// =============================================================================

/// Decoded fixed-width header of a generation file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: i64,
    pub entry_count: u64,
    pub has_tombstone: bool,
}

impl Header {
    /// Decode the header from the start of a mapped file.
    ///
    /// Only structural problems are reported here; the version is checked by
    /// the caller, which knows the file path.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if (buf.len() as u64) < HEADER_SIZE {
            return Err(GenKvError::corruption(format!(
                "file too small for header: {} bytes",
                buf.len()
            )));
        }

        let version = read_i64(buf, VERSION_OFFSET)?;
        let entry_count = read_i64(buf, COUNT_OFFSET)?;
        let flag = read_i64(buf, TOMBSTONE_FLAG_OFFSET)?;

        if entry_count < 0 {
            return Err(GenKvError::corruption(format!(
                "negative entry count {}",
                entry_count
            )));
        }

        Ok(Self {
            version,
            entry_count: entry_count as u64,
            has_tombstone: flag == 1,
        })
    }

    /// First byte of the data region for a file with this many entries
    pub fn data_start(&self) -> u64 {
        data_start(self.entry_count)
    }
}

/// Offset of the data region for `entry_count` entries
pub fn data_start(entry_count: u64) -> u64 {
    HEADER_SIZE + INDEX_RECORD_SIZE * entry_count
}

// =============================================================================
// Sizes
// =============================================================================

/// Serialized size of a key record plus value record (no index slot)
pub fn record_size(key: &[u8], value: Option<&[u8]>) -> u64 {
    let value_len = value.map_or(0, |v| v.len() as u64);
    FIELD_SIZE + key.len() as u64 + FIELD_SIZE + value_len
}

/// On-disk footprint of one entry: its records plus one index slot.
///
/// The write buffer above this layer uses it to decide when to flush.
pub fn size_on_disk(entry: &Entry) -> u64 {
    record_size(entry.key(), entry.value()) + INDEX_RECORD_SIZE
}

// =============================================================================
// Fixed-width accessors
// =============================================================================

/// Read an 8-byte native-endian signed integer at `offset`
pub(crate) fn read_i64(buf: &[u8], offset: u64) -> Result<i64> {
    let start = usize::try_from(offset)
        .map_err(|_| GenKvError::corruption(format!("offset {} out of range", offset)))?;
    let bytes = start
        .checked_add(FIELD_SIZE as usize)
        .and_then(|end| buf.get(start..end))
        .ok_or_else(|| {
            GenKvError::corruption(format!(
                "read of 8 bytes at {} past end of {}-byte file",
                offset,
                buf.len()
            ))
        })?;
    let mut raw = [0u8; FIELD_SIZE as usize];
    raw.copy_from_slice(bytes);
    Ok(i64::from_ne_bytes(raw))
}

/// Write an 8-byte native-endian signed integer at `offset`
pub(crate) fn write_i64(buf: &mut [u8], offset: u64, value: i64) {
    let start = offset as usize;
    buf[start..start + FIELD_SIZE as usize].copy_from_slice(&value.to_ne_bytes());
}

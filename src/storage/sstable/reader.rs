//! SSTable Reader
//!
//! Maps a generation file read-only and serves O(log n) key lookups by
//! binary search over the on-disk offset index. Nothing is copied: keys and
//! values come back as `Bytes` slices of the mapping.

use std::cmp::Ordering;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use memmap2::Mmap;
use tracing::debug;

use crate::error::{GenKvError, Result};
use crate::storage::Entry;

use super::{read_i64, Header, FIELD_SIZE, HEADER_SIZE, INDEX_RECORD_SIZE, TOMBSTONE_MARKER, VERSION};

/// Outcome of a binary search over one generation's offset index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    /// The key is stored at this index
    Found(u64),
    /// The key is absent; this is where it would be inserted, i.e. the
    /// number of keys strictly less than it
    NotFound(u64),
}

impl SearchResult {
    /// Index of the first key `>=` the searched key
    pub fn position(self) -> u64 {
        match self {
            SearchResult::Found(i) | SearchResult::NotFound(i) => i,
        }
    }

    /// Index of the key if it was present
    pub fn found(self) -> Option<u64> {
        match self {
            SearchResult::Found(i) => Some(i),
            SearchResult::NotFound(_) => None,
        }
    }
}

/// One read-only mapped generation file.
///
/// Cloning is cheap (reference-counted); every clone and every slice handed
/// out keeps the underlying mapping alive.
#[derive(Clone)]
pub struct Generation {
    /// Position in the generation set (0 = oldest)
    id: usize,
    path: Arc<PathBuf>,
    data: Bytes,
    header: Header,
}

impl Generation {
    /// Map the file at `path` and validate its header.
    ///
    /// Fails with `UnsupportedVersion` for files of another format version
    /// and `Corruption` when the header or index cannot fit in the file.
    pub fn open(id: usize, path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE {
            return Err(GenKvError::corruption(format!(
                "{} is {} bytes, smaller than the header",
                path.display(),
                file_size
            )));
        }

        // SAFETY: generation files are never modified after their atomic
        // publication, so the mapped bytes cannot change underneath us.
        let map = unsafe { Mmap::map(&file)? };
        let header = Header::decode(&map)?;

        if header.version != VERSION {
            return Err(GenKvError::UnsupportedVersion {
                path: path.to_path_buf(),
                version: header.version,
            });
        }

        let index_end = header
            .entry_count
            .checked_mul(INDEX_RECORD_SIZE)
            .and_then(|n| n.checked_add(HEADER_SIZE));
        if index_end.map_or(true, |end| end > file_size) {
            return Err(GenKvError::corruption(format!(
                "{} claims {} entries but is only {} bytes",
                path.display(),
                header.entry_count,
                file_size
            )));
        }

        debug!(
            path = %path.display(),
            generation = id,
            entries = header.entry_count,
            bytes = file_size,
            "Mapped generation"
        );

        Ok(Self {
            id,
            path: Arc::new(path.to_path_buf()),
            data: Bytes::from_owner(map),
            header,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_count(&self) -> u64 {
        self.header.entry_count
    }

    pub fn has_tombstone(&self) -> bool {
        self.header.has_tombstone
    }

    pub fn file_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Binary search for `key` using unsigned lexicographic byte order
    pub fn search(&self, key: &[u8]) -> Result<SearchResult> {
        let mut low = 0u64;
        let mut high = self.header.entry_count;

        while low < high {
            let mid = low + (high - low) / 2;
            match self.key_at(mid)?.cmp(key) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Ok(SearchResult::Found(mid)),
            }
        }

        Ok(SearchResult::NotFound(low))
    }

    /// Resolve an optional range bound to an index.
    ///
    /// `None` resolves to `absent`; a key resolves to the first index whose
    /// key is `>=` it.
    pub fn bound(&self, key: Option<&[u8]>, absent: u64) -> Result<u64> {
        match key {
            None => Ok(absent),
            Some(key) => Ok(self.search(key)?.position()),
        }
    }

    /// Entry stored at `index`, as zero-copy slices of the mapping
    pub fn entry_at(&self, index: u64) -> Result<Entry> {
        let (key_start, key_len) = self.key_span(index)?;
        let value_offset = key_start + key_len;
        let value_len = read_i64(&self.data, value_offset)?;

        let value = if value_len == TOMBSTONE_MARKER {
            None
        } else {
            let value_start = value_offset + FIELD_SIZE;
            Some(self.data.slice(self.span(value_start, value_len)?))
        };

        Ok(Entry {
            key: self.data.slice(key_start as usize..(key_start + key_len) as usize),
            value,
        })
    }

    /// Key stored at `index`, borrowed from the mapping
    pub fn key_at(&self, index: u64) -> Result<&[u8]> {
        let (start, len) = self.key_span(index)?;
        Ok(&self.data[start as usize..(start + len) as usize])
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// (start, length) of the key bytes of entry `index`
    fn key_span(&self, index: u64) -> Result<(u64, u64)> {
        if index >= self.header.entry_count {
            return Err(GenKvError::corruption(format!(
                "entry index {} out of range ({} entries)",
                index, self.header.entry_count
            )));
        }

        let offset = read_i64(&self.data, HEADER_SIZE + index * INDEX_RECORD_SIZE)?;
        if offset < 0 {
            return Err(GenKvError::corruption(format!(
                "negative offset {} for entry {}",
                offset, index
            )));
        }

        let offset = offset as u64;
        let key_len = read_i64(&self.data, offset)?;
        let range = self.span(offset + FIELD_SIZE, key_len)?;
        Ok((range.start as u64, key_len as u64))
    }

    /// Validate that `len` bytes starting at `start` lie inside the mapping
    fn span(&self, start: u64, len: i64) -> Result<std::ops::Range<usize>> {
        if len < 0 {
            return Err(GenKvError::corruption(format!(
                "negative record length {} at {}",
                len, start
            )));
        }

        let end = start.checked_add(len as u64);
        match end {
            Some(end) if end <= self.data.len() as u64 => Ok(start as usize..end as usize),
            _ => Err(GenKvError::corruption(format!(
                "record of {} bytes at {} runs past end of {}",
                len,
                start,
                self.path.display()
            ))),
        }
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generation")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("header", &self.header)
            .finish()
    }
}

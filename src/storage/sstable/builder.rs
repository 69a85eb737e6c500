//! SSTable Writer
//!
//! Serializes a sorted, duplicate-free entry sequence into a new generation
//! file. The file is built in a temp sibling through a writable mapping and
//! only renamed onto its final path once fully written and flushed.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;
use tracing::{debug, info};

use crate::error::{GenKvError, Result};
use crate::storage::files;
use crate::storage::Entry;

use super::{
    data_start, record_size, write_i64, COUNT_OFFSET, FIELD_SIZE, HEADER_SIZE, INDEX_RECORD_SIZE,
    TOMBSTONE_FLAG_OFFSET, TOMBSTONE_MARKER, VERSION, VERSION_OFFSET,
};

/// Metadata of a freshly published generation file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationMeta {
    /// Final path of the file
    pub path: PathBuf,
    /// Number of entries (tombstones included)
    pub entry_count: u64,
    /// Whether any entry is a tombstone
    pub has_tombstone: bool,
    /// File size in bytes
    pub file_size: u64,
}

/// Result of the sizing pre-pass
struct Layout {
    entry_count: u64,
    data_size: u64,
    has_tombstone: bool,
}

/// Write `entries` as a generation file at `path`.
///
/// `entries` is walked twice (sizing, then writing) and must yield the same
/// sequence both times, in strictly ascending key order. Readers of `path`
/// observe either its previous state or the complete new file.
pub fn write_generation<'a, I>(path: &Path, entries: I, sync_directory: bool) -> Result<GenerationMeta>
where
    I: IntoIterator<Item = &'a Entry> + Clone,
{
    let layout = measure(entries.clone())?;
    let file_size = data_start(layout.entry_count) + layout.data_size;
    let tmp_path = files::temp_path(path);

    debug!(
        path = %tmp_path.display(),
        entries = layout.entry_count,
        bytes = file_size,
        "Writing generation to temp file"
    );

    if let Err(e) = write_temp(&tmp_path, entries, &layout, file_size) {
        // Never promoted; best effort cleanup, the next writer overwrites it anyway
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path)?;
    if sync_directory {
        files::sync_parent_dir(path)?;
    }

    info!(
        path = %path.display(),
        entries = layout.entry_count,
        has_tombstone = layout.has_tombstone,
        "Published generation"
    );

    Ok(GenerationMeta {
        path: path.to_path_buf(),
        entry_count: layout.entry_count,
        has_tombstone: layout.has_tombstone,
        file_size,
    })
}

/// Pre-pass: total data bytes, count, tombstone presence, order check
fn measure<'a, I>(entries: I) -> Result<Layout>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut layout = Layout {
        entry_count: 0,
        data_size: 0,
        has_tombstone: false,
    };
    let mut previous: Option<&[u8]> = None;

    for entry in entries {
        if let Some(prev) = previous {
            if prev >= entry.key() {
                return Err(GenKvError::InvalidArgument(format!(
                    "entries must be strictly ascending by key (entry #{} is out of order)",
                    layout.entry_count
                )));
            }
        }
        previous = Some(entry.key());

        layout.data_size += record_size(entry.key(), entry.value());
        layout.has_tombstone |= entry.is_tombstone();
        layout.entry_count += 1;
    }

    Ok(layout)
}

/// Create, size, map and fill the temp file, then force it to disk
fn write_temp<'a, I>(tmp_path: &Path, entries: I, layout: &Layout, file_size: u64) -> Result<()>
where
    I: IntoIterator<Item = &'a Entry>,
{
    match fs::remove_file(tmp_path) {
        Ok(()) => debug!(path = %tmp_path.display(), "Removed stale temp file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let file: File = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(tmp_path)?;
    file.set_len(file_size)?;

    // SAFETY: the temp file was just created by us and no other mapping or
    // handle to it exists until it is renamed.
    let mut map = unsafe { MmapMut::map_mut(&file)? };

    let mut index = 0u64;
    let mut offset = data_start(layout.entry_count);
    let mut previous: Option<&[u8]> = None;

    for entry in entries {
        let size = record_size(entry.key(), entry.value());
        if index >= layout.entry_count || offset + size > file_size {
            return Err(changed_between_passes());
        }
        if previous.map_or(false, |prev| prev >= entry.key()) {
            return Err(changed_between_passes());
        }
        previous = Some(entry.key());

        write_i64(&mut map, HEADER_SIZE + index * INDEX_RECORD_SIZE, offset as i64);
        offset += write_record(&mut map, offset, Some(entry.key()));
        offset += write_record(&mut map, offset, entry.value());
        index += 1;
    }

    if index != layout.entry_count {
        return Err(changed_between_passes());
    }

    write_i64(&mut map, VERSION_OFFSET, VERSION);
    write_i64(&mut map, COUNT_OFFSET, layout.entry_count as i64);
    write_i64(&mut map, TOMBSTONE_FLAG_OFFSET, layout.has_tombstone as i64);

    map.flush()?;
    drop(map);
    file.sync_all()?;

    Ok(())
}

/// Write one length-prefixed record; `None` writes the tombstone sentinel.
/// Returns the number of bytes written.
fn write_record(map: &mut [u8], offset: u64, record: Option<&[u8]>) -> u64 {
    match record {
        None => {
            write_i64(map, offset, TOMBSTONE_MARKER);
            FIELD_SIZE
        }
        Some(bytes) => {
            write_i64(map, offset, bytes.len() as i64);
            let start = (offset + FIELD_SIZE) as usize;
            map[start..start + bytes.len()].copy_from_slice(bytes);
            FIELD_SIZE + bytes.len() as u64
        }
    }
}

fn changed_between_passes() -> GenKvError {
    GenKvError::InvalidArgument("entries changed between sizing and write passes".to_string())
}

//! File naming and publication helpers
//!
//! ```text
//! {data_dir}/sstable_000000.sst   generation 0 (oldest)
//! {data_dir}/sstable_000001.sst   generation 1
//! {data_dir}/<name>.tmp           file being written, never read
//! {data_dir}/compaction.sst       compaction output not yet finalized
//! ```

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;

/// Name of the compaction output; its presence marks an unfinished compaction
pub const COMPACTION_FILE: &str = "compaction.sst";

const SSTABLE_PREFIX: &str = "sstable_";
const SSTABLE_EXTENSION: &str = "sst";
const TEMP_SUFFIX: &str = ".tmp";

/// Path of generation `index` inside `dir`
pub fn generation_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{}{:06}.{}", SSTABLE_PREFIX, index, SSTABLE_EXTENSION))
}

/// Parse the generation index from a file name
/// "sstable_000042.sst" → Some(42)
pub fn parse_generation_index(path: &Path) -> Option<usize> {
    if path.extension()? != SSTABLE_EXTENSION {
        return None;
    }
    let name = path.file_stem()?.to_str()?;
    let digits = name.strip_prefix(SSTABLE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Temp sibling used while writing `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Path of the compaction output / crash marker
pub fn compaction_path(dir: &Path) -> PathBuf {
    dir.join(COMPACTION_FILE)
}

/// Paths of the contiguous generation run 0, 1, 2, ... present in `dir`.
///
/// Stops at the first missing index. Failing to stat a file is an error,
/// not a gap.
pub fn existing_generations(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    loop {
        let path = generation_path(dir, paths.len());
        if !path.try_exists()? {
            return Ok(paths);
        }
        paths.push(path);
    }
}

/// fsync the directory containing `path` so a rename or removal is durable
pub fn sync_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => sync_dir(dir),
        _ => sync_dir(Path::new(".")),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Make the compaction output the sole generation 0.
///
/// Steps, each safe to repeat after a crash:
/// 1. remove every generation file, newest first
/// 2. rename the compaction output onto generation 0
///
/// The marker is only consumed by step 2, so any interruption leaves it in
/// place and the next open runs this again.
pub fn finish_compaction(config: &Config) -> Result<()> {
    let dir = &config.data_dir;
    let compacted = compaction_path(dir);

    let mut stale: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && parse_generation_index(&path).is_some() {
            stale.push(path);
        }
    }
    stale.sort_by_key(|p| std::cmp::Reverse(parse_generation_index(p)));

    for path in &stale {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "Removed compacted generation"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    if config.sync_directory {
        sync_dir(dir)?;
    }

    fs::rename(&compacted, generation_path(dir, 0))?;

    if config.sync_directory {
        sync_dir(dir)?;
    }

    info!(removed = stale.len(), "Finished compaction");
    Ok(())
}

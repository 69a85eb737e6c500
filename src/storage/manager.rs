//! Storage Manager
//!
//! Read-only handle over one generation set plus the write-side entry points
//! that publish new generations.
//!
//! ## Responsibilities
//! - Finish an interrupted compaction before anything is read
//! - Map every generation file 0, 1, 2, ... (oldest → newest)
//! - Point lookups newest → oldest, bounded cursors per generation
//! - Write new generations and compactions via temp file + atomic rename
//! - Idempotent close that readers can tell apart from corruption

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;

use super::files;
use super::merge::MergedRange;
use super::scope::Scope;
use super::sstable::{self, write_generation, Generation, GenerationCursor, GenerationMeta, SearchResult};
use super::Entry;

/// An open, immutable view of all generations present at load time.
///
/// ## Concurrency:
/// - All read methods take `&self`; the mapped files are never mutated, so
///   any number of threads may read at once
/// - `close` may race with in-flight reads; those either finish normally or
///   fail with `GenKvError::Closed`
/// - Writes (`save`/`compact`) only touch fresh temp files. Callers must run
///   at most one at a time and reload to see the result
pub struct Storage {
    config: Config,
    scope: Scope,
    /// Number of generations mapped at load time
    generation_count: usize,
    /// Tombstone flag of the oldest generation (generation 0)
    has_tombstones: bool,
}

impl Storage {
    /// Open the generation set under `config.data_dir`
    ///
    /// On startup:
    /// 1. Create directory if allowed and missing
    /// 2. Finish a half-done compaction if its output is still present
    /// 3. Map generation files in index order until the first gap
    pub fn load(config: &Config) -> Result<Self> {
        config.validate()?;
        let dir = config.data_dir.as_path();

        if config.create_if_missing {
            fs::create_dir_all(dir)?;
        }

        let marker = files::compaction_path(dir);
        if marker.try_exists()? {
            warn!(path = %marker.display(), "Found unfinished compaction, completing it");
            files::finish_compaction(config)?;
        }

        let mut generations = Vec::new();
        for (id, path) in files::existing_generations(dir)?.iter().enumerate() {
            generations.push(Generation::open(id, path)?);
        }

        let generation_count = generations.len();
        let has_tombstones = generations.first().map_or(false, |g| g.has_tombstone());

        info!(
            dir = %dir.display(),
            generations = generation_count,
            "Loaded storage"
        );

        Ok(Self {
            config: config.clone(),
            scope: Scope::new(generations),
            generation_count,
            has_tombstones,
        })
    }

    /// Write `entries` as the generation after the last one of this handle.
    ///
    /// `entries` must be strictly ascending by key and yield the same
    /// sequence on every pass. The new generation is visible to handles
    /// loaded afterwards, not to this one.
    ///
    /// The target index is fixed at load time, so a second `save` on the
    /// same handle replaces the generation the first one wrote. Call `save`
    /// once per handle and reload before saving again.
    pub fn save<'a, I>(&self, entries: I) -> Result<GenerationMeta>
    where
        I: IntoIterator<Item = &'a Entry> + Clone,
    {
        let path = files::generation_path(&self.config.data_dir, self.generation_count);
        write_generation(&path, entries, self.config.sync_directory)
    }

    /// Replace every generation with `live`, the merged live view.
    ///
    /// The output is first written to the compaction marker path, then
    /// promoted to generation 0 while older generations are removed. A crash
    /// in between is completed by the next `load`.
    pub fn compact<'a, I>(config: &Config, live: I) -> Result<GenerationMeta>
    where
        I: IntoIterator<Item = &'a Entry> + Clone,
    {
        config.validate()?;
        let marker = files::compaction_path(&config.data_dir);
        let mut meta = write_generation(&marker, live, config.sync_directory)?;

        files::finish_compaction(config)?;
        meta.path = files::generation_path(&config.data_dir, 0);

        info!(entries = meta.entry_count, "Compacted storage into one generation");
        Ok(meta)
    }

    /// Look `key` up, newest generation first.
    ///
    /// Returns:
    /// - `Ok(Some(entry))` with a value: key is live
    /// - `Ok(Some(entry))` without a value: key was deleted (tombstone)
    /// - `Ok(None)`: key is in no generation
    pub fn get(&self, key: &[u8]) -> Result<Option<Entry>> {
        let generations = self.scope.generations()?;

        for generation in generations.iter().rev() {
            let found = generation
                .search(key)
                .map_err(|e| self.scope.check(e))?;

            if let SearchResult::Found(index) = found {
                return generation
                    .entry_at(index)
                    .map(Some)
                    .map_err(|e| self.scope.check(e));
            }
        }

        Ok(None)
    }

    /// One cursor per generation over keys in `[from, to)`, ordered
    /// oldest → newest.
    ///
    /// `None` bounds mean "from the first key" / "past the last key".
    /// Cursors are not merged; see [`Storage::range`] for that.
    pub fn iterate(&self, from: Option<&[u8]>, to: Option<&[u8]>) -> Result<Vec<GenerationCursor>> {
        let generations = self.scope.generations()?;
        let mut cursors = Vec::with_capacity(generations.len());

        for generation in generations.iter() {
            let start = generation
                .bound(from, 0)
                .map_err(|e| self.scope.check(e))?;
            let end = generation
                .bound(to, generation.entry_count())
                .map_err(|e| self.scope.check(e))?;

            cursors.push(GenerationCursor::new(
                generation.clone(),
                self.scope.clone(),
                start,
                end,
            ));
        }

        Ok(cursors)
    }

    /// Live entries in `[from, to)` across all generations, newest wins,
    /// tombstones removed
    pub fn range(&self, from: Option<&[u8]>, to: Option<&[u8]>) -> Result<MergedRange<GenerationCursor>> {
        Ok(MergedRange::new(self.iterate(from, to)?))
    }

    /// Release all mappings. Never fails; repeated or concurrent calls are
    /// no-ops.
    pub fn close(&self) {
        self.scope.close();
    }

    pub fn is_closed(&self) -> bool {
        !self.scope.is_alive()
    }

    /// True when empty, or a single generation with no tombstones.
    ///
    /// The tombstone flag consulted is generation 0's only; with several
    /// generations the answer is `false` regardless.
    pub fn is_compacted(&self) -> bool {
        match self.generation_count {
            0 => true,
            1 => !self.has_tombstones,
            _ => false,
        }
    }

    /// On-disk footprint of `entry` in a generation file
    pub fn size_on_disk(entry: &Entry) -> u64 {
        sstable::size_on_disk(entry)
    }

    // =========================================================================
    // Accessors (for tooling and tests)
    // =========================================================================

    /// Number of generations mapped by this handle
    pub fn generation_count(&self) -> usize {
        self.generation_count
    }

    /// Tombstone flag of generation 0
    pub fn has_tombstones(&self) -> bool {
        self.has_tombstones
    }

    /// The mapped generations, oldest → newest
    pub fn generations(&self) -> Result<Arc<[Generation]>> {
        self.scope.generations()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        self.scope.close();
    }
}

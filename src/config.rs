//! Configuration for GenKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{GenKvError, Result};

/// Main configuration for a GenKV storage directory
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all generation files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── sstable_000000.sst   (oldest generation)
    ///     ├── sstable_000001.sst
    ///     ├── ...                  (newest generation last)
    ///     └── compaction.sst       (only while a compaction is unfinished)
    pub data_dir: PathBuf,

    /// Create `data_dir` on load if it does not exist yet.
    ///
    /// When false, loading a missing directory still succeeds with an empty
    /// generation set; a later `save` then fails with a `NotFound` I/O error.
    pub create_if_missing: bool,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// fsync the directory after every rename/removal so the publication
    /// itself survives a power loss, not just the file contents
    pub sync_directory: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./genkv_data"),
            create_if_missing: true,
            sync_directory: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Config rooted at `path`, everything else default
    pub fn with_data_dir(path: impl Into<PathBuf>) -> Self {
        Self::builder().data_dir(path).build()
    }

    /// Reject settings the storage layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(GenKvError::Config("data_dir must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all generation files)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Create the data directory on load when missing (see
    /// [`Config::create_if_missing`])
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    /// fsync the directory after publishing files
    pub fn sync_directory(mut self, sync: bool) -> Self {
        self.config.sync_directory = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

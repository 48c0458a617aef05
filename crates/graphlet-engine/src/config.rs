//! Database configuration.

use std::path::{Path, PathBuf};

use graphlet_common::utils::error::{Result, ValidationError};

/// Default number of ids or timestamps leased per persisted batch.
pub const DEFAULT_LEASE_BATCH: u64 = 10_000;

/// Default cap on the rows one `@normalize` query block may produce.
pub const DEFAULT_LIMIT_NORMALIZE_NODE: usize = 10_000;

/// Database configuration.
///
/// ```
/// use graphlet_engine::Config;
///
/// let config = Config::persistent("./data")
///     .with_uid_lease_batch(1_000)
///     .with_limit_normalize_node(500);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Data directory. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Journal writes to `data_dir/wal`.
    pub wal_enabled: bool,
    /// Entity ids leased per batch.
    pub uid_lease_batch: u64,
    /// Timestamps leased per batch.
    pub ts_lease_batch: u64,
    /// Cap on rows produced by one `@normalize` query block.
    pub limit_normalize_node: usize,
}

impl Config {
    /// Configuration for a volatile database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            wal_enabled: false,
            uid_lease_batch: DEFAULT_LEASE_BATCH,
            ts_lease_batch: DEFAULT_LEASE_BATCH,
            limit_normalize_node: DEFAULT_LIMIT_NORMALIZE_NODE,
        }
    }

    /// Configuration for a database stored in `dir`.
    #[must_use]
    pub fn persistent(dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: Some(dir.as_ref().to_path_buf()),
            wal_enabled: true,
            ..Self::in_memory()
        }
    }

    /// Enables or disables the WAL.
    #[must_use]
    pub fn with_wal(mut self, enabled: bool) -> Self {
        self.wal_enabled = enabled;
        self
    }

    /// Sets the entity-id lease batch size.
    #[must_use]
    pub fn with_uid_lease_batch(mut self, batch: u64) -> Self {
        self.uid_lease_batch = batch;
        self
    }

    /// Sets the timestamp lease batch size.
    #[must_use]
    pub fn with_ts_lease_batch(mut self, batch: u64) -> Self {
        self.ts_lease_batch = batch;
        self
    }

    /// Sets the `@normalize` row cap.
    #[must_use]
    pub fn with_limit_normalize_node(mut self, limit: usize) -> Self {
        self.limit_normalize_node = limit;
        self
    }

    /// Returns true if the database writes to disk.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.data_dir.is_some() && self.wal_enabled
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDataDir`] for an empty directory
    /// path, and [`ValidationError::UnsupportedType`] for zero batch sizes.
    pub fn validate(&self) -> Result<()> {
        if self
            .data_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            return Err(ValidationError::EmptyDataDir.into());
        }
        if self.uid_lease_batch == 0 || self.ts_lease_batch == 0 {
            return Err(ValidationError::UnsupportedType("lease batch of 0".to_string()).into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::in_memory()
    }
}

//! WAL log file management.

use super::WalRecord;
use graphlet_common::utils::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// When appended records reach stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync after every record.
    #[default]
    Sync,
    /// Flush to the OS after every record; fsync only on [`WalManager::sync`].
    NoSync,
}

/// Manages the Write-Ahead Log.
pub struct WalManager {
    /// Path to the WAL file.
    path: PathBuf,
    /// Writer for appending records.
    writer: Mutex<Option<BufWriter<File>>>,
    /// Number of records written since open.
    record_count: Mutex<u64>,
    durability: DurabilityMode,
}

impl WalManager {
    /// Opens or creates a WAL file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_durability(path, DurabilityMode::default())
    }

    /// Opens or creates a WAL file with an explicit durability mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn with_durability(path: impl AsRef<Path>, durability: DurabilityMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        Ok(Self {
            path,
            writer: Mutex::new(Some(BufWriter::new(file))),
            record_count: Mutex::new(0),
            durability,
        })
    }

    /// Logs a record to the WAL. The record is on disk (or handed to the
    /// OS, under [`DurabilityMode::NoSync`]) when this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn log(&self, record: &WalRecord) -> Result<()> {
        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| Error::Internal("WAL writer not available".to_string()))?;

        let data = bincode::serde::encode_to_vec(record, bincode::config::standard())
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let len = u32::try_from(data.len())
            .map_err(|_| Error::Serialization(format!("WAL record of {} bytes", data.len())))?;

        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&data)?;
        writer.write_all(&crc32fast::hash(&data).to_le_bytes())?;
        writer.flush()?;
        if self.durability == DurabilityMode::Sync {
            writer.get_ref().sync_data()?;
        }

        *self.record_count.lock() += 1;
        tracing::trace!(record = record.name(), bytes = data.len(), "WAL append");
        Ok(())
    }

    /// Syncs the WAL to disk (fsync).
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    pub fn sync(&self) -> Result<()> {
        let mut guard = self.writer.lock();
        if let Some(writer) = guard.as_mut() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Syncs and releases the file. Later appends fail.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.writer.lock();
        if let Some(mut writer) = guard.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Returns the number of records written since open.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        *self.record_count.lock()
    }

    /// Returns the path to the WAL file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlet_common::types::NamespaceId;
    use tempfile::tempdir;

    #[test]
    fn test_wal_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");

        let wal = WalManager::with_durability(&path, DurabilityMode::NoSync).unwrap();
        wal.log(&WalRecord::DropNamespace {
            namespace: NamespaceId::new(3),
        })
        .unwrap();

        assert_eq!(wal.record_count(), 1);
        assert!(std::fs::metadata(&path).unwrap().len() > 8);
    }

    #[test]
    fn test_log_after_close_fails() {
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path().join("test.wal")).unwrap();
        wal.close().unwrap();
        assert!(wal.log(&WalRecord::DropAll).is_err());
    }
}

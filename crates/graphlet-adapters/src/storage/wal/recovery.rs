//! WAL recovery.

use super::WalRecord;
use graphlet_common::utils::error::{Error, Result, StorageError};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Records read back from a WAL file.
#[derive(Debug, Default)]
pub struct Recovered {
    /// Intact records in append order.
    pub records: Vec<WalRecord>,
    /// Byte length of the intact prefix.
    pub valid_len: u64,
    /// True if bytes after the intact prefix were ignored.
    pub torn: bool,
}

/// Handles WAL recovery after a crash.
pub struct WalRecovery {
    /// Path to the WAL file.
    path: PathBuf,
}

impl WalRecovery {
    /// Creates a new recovery handler for the given WAL file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Reads every intact record. A missing file recovers as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn recover(&self) -> Result<Recovered> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Recovered::default()),
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut recovered = Recovered::default();

        loop {
            match Self::read_record(&mut reader, file_len) {
                Ok(Some((record, frame_len))) => {
                    recovered.records.push(record);
                    recovered.valid_len += frame_len;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("WAL corruption detected: {}", e);
                    break;
                }
            }
        }
        recovered.torn = recovered.valid_len < file_len;
        Ok(recovered)
    }

    /// Recovers records and cuts the file back to its intact prefix so new
    /// appends follow the last good record.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or truncated.
    pub fn recover_and_truncate(&self) -> Result<Recovered> {
        let recovered = self.recover()?;
        if recovered.torn {
            tracing::warn!(
                path = %self.path.display(),
                valid_len = recovered.valid_len,
                "truncating torn WAL tail"
            );
            let file = OpenOptions::new().write(true).open(&self.path)?;
            file.set_len(recovered.valid_len)?;
            file.sync_all()?;
        }
        Ok(recovered)
    }

    fn read_record(
        reader: &mut BufReader<File>,
        file_len: u64,
    ) -> Result<Option<(WalRecord, u64)>> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        if len as u64 > file_len {
            return Err(Error::Storage(StorageError::Corruption(format!(
                "WAL frame length {len} exceeds file size"
            ))));
        }

        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;

        let mut checksum_buf = [0u8; 4];
        reader.read_exact(&mut checksum_buf)?;
        if u32::from_le_bytes(checksum_buf) != crc32fast::hash(&data) {
            return Err(Error::Storage(StorageError::Corruption(
                "WAL checksum mismatch".to_string(),
            )));
        }

        let (record, _): (WalRecord, _) =
            bincode::serde::decode_from_slice(&data, bincode::config::standard())
                .map_err(|e| Error::Serialization(e.to_string()))?;

        Ok(Some((record, len as u64 + 8)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::wal::WalManager;
    use graphlet_common::types::{Mutation, NamespaceId, Timestamp, Triple, Uid};
    use std::io::Write;
    use tempfile::tempdir;

    fn commit(ts: u64) -> WalRecord {
        WalRecord::Commit {
            namespace: NamespaceId::DEFAULT,
            commit_ts: Timestamp::new(ts),
            mutation: Mutation {
                set: vec![Triple::new(Uid::new(2), "User.name", "A")],
                del: Vec::new(),
            },
        }
    }

    #[test]
    fn test_recovery_reads_records_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        {
            let wal = WalManager::open(&path).unwrap();
            wal.log(&commit(3)).unwrap();
            wal.log(&commit(4)).unwrap();
        }

        let recovered = WalRecovery::new(&path).recover().unwrap();
        assert_eq!(recovered.records, vec![commit(3), commit(4)]);
        assert!(!recovered.torn);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let recovered = WalRecovery::new(dir.path().join("absent.wal")).recover().unwrap();
        assert!(recovered.records.is_empty());
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        {
            let wal = WalManager::open(&path).unwrap();
            wal.log(&commit(3)).unwrap();
        }
        let good_len = std::fs::metadata(&path).unwrap().len();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[42, 0, 0, 0, 1, 2]).unwrap();
        }

        let recovered = WalRecovery::new(&path).recover_and_truncate().unwrap();
        assert_eq!(recovered.records.len(), 1);
        assert!(recovered.torn);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);

        {
            let wal = WalManager::open(&path).unwrap();
            wal.log(&commit(5)).unwrap();
        }
        let again = WalRecovery::new(&path).recover().unwrap();
        assert_eq!(again.records, vec![commit(3), commit(5)]);
    }

    #[test]
    fn test_checksum_mismatch_stops_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.wal");
        {
            let wal = WalManager::open(&path).unwrap();
            wal.log(&commit(3)).unwrap();
            wal.log(&commit(4)).unwrap();
        }
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();

        let recovered = WalRecovery::new(&path).recover().unwrap();
        assert_eq!(recovered.records, vec![commit(3)]);
        assert!(recovered.torn);
    }
}

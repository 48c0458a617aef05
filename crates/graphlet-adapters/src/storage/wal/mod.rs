//! Write-Ahead Log (WAL) for durability.
//!
//! Each record is framed as a little-endian `u32` length, the bincode
//! payload, and a CRC-32 of the payload. Recovery stops at the first frame
//! that is short or fails its checksum and reports how many bytes were
//! valid, so a torn tail from a crash can be cut off before new records
//! are appended.
//!
//! - [`DurabilityMode::Sync`] - fsync after every record
//! - [`DurabilityMode::NoSync`] - flush to the OS only

mod log;
mod record;
mod recovery;

pub use log::{DurabilityMode, WalManager};
pub use record::WalRecord;
pub use recovery::{Recovered, WalRecovery};

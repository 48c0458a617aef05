//! Lease manager for entity ids, timestamps and namespace ids.
//!
//! Ids and timestamps are handed out from in-memory ranges whose upper
//! bound is persisted before any value inside the range is returned. After
//! a crash the manager resumes at the persisted upper bound, so a value is
//! never issued twice even if the process died mid-batch.
//!
//! The state lives in the engine's reserved record at
//! [`RESERVED_UID`]/[`RESERVED_TS`], outside the user id space: entity ids
//! start at 2 and timestamps at 3.

use std::sync::Arc;

use graphlet_common::types::{NamespaceId, Timestamp, Uid};
use graphlet_common::utils::error::{Error, Result};
use graphlet_core::{Engine, RESERVED_TS, RESERVED_UID};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_LEASE_BATCH;

/// First entity id handed to user data.
pub const INITIAL_UID: u64 = 2;

/// First timestamp handed to user transactions.
pub const INITIAL_TS: u64 = 3;

/// The durable part of the lease state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedLease {
    /// End of the current entity-id batch.
    pub max_uid: u64,
    /// End of the current timestamp batch.
    pub max_ts: u64,
    /// Last namespace id handed out.
    pub max_ns: u64,
}

/// A snapshot of the lease counters.
///
/// `min_*` is the next value to hand out, `max_*` the end of the current
/// batch. `min_* <= max_*` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseState {
    /// Next entity id.
    pub min_uid: u64,
    /// End of the entity-id batch.
    pub max_uid: u64,
    /// Next timestamp.
    pub min_ts: u64,
    /// End of the timestamp batch.
    pub max_ts: u64,
    /// Last namespace id handed out.
    pub last_ns: u64,
}

impl LeaseState {
    fn persisted(&self) -> PersistedLease {
        PersistedLease {
            max_uid: self.max_uid,
            max_ts: self.max_ts,
            max_ns: self.last_ns,
        }
    }
}

/// An inclusive range of entity ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidRange {
    /// First id.
    pub start: Uid,
    /// Last id, inclusive.
    pub end: Uid,
}

/// Allocates entity ids, transaction timestamps and namespace ids.
pub struct LeaseManager {
    engine: Arc<dyn Engine>,
    state: Mutex<LeaseState>,
    uid_batch: u64,
    ts_batch: u64,
    restarted: bool,
}

impl LeaseManager {
    /// Loads the lease state from `engine`, or starts fresh, and primes the
    /// engine's counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted state cannot be read or the first
    /// batches cannot be leased.
    pub fn open(engine: Arc<dyn Engine>, uid_batch: u64, ts_batch: u64) -> Result<Self> {
        let persisted = read_persisted(engine.as_ref())?;
        let restarted = persisted.is_some();
        let state = match persisted {
            Some(p) => LeaseState {
                min_uid: p.max_uid,
                max_uid: p.max_uid,
                min_ts: p.max_ts,
                max_ts: p.max_ts,
                last_ns: p.max_ns,
            },
            None => LeaseState {
                min_uid: INITIAL_UID,
                max_uid: INITIAL_UID,
                min_ts: INITIAL_TS,
                max_ts: INITIAL_TS,
                last_ns: 0,
            },
        };

        engine.publish_max_assigned(Timestamp::new(state.min_ts - 1));
        engine.bump_max_uid(Uid::new(state.min_uid - 1));

        let manager = Self {
            engine,
            state: Mutex::new(state),
            uid_batch: uid_batch.max(1),
            ts_batch: ts_batch.max(1),
            restarted,
        };
        {
            let mut state = manager.state.lock();
            let (min_uid, min_ts) = (state.min_uid, state.min_ts);
            manager.extend_uids(&mut state, min_uid)?;
            manager.extend_ts(&mut state, min_ts)?;
        }

        let ready = manager.state();
        tracing::info!(
            restarted,
            next_uid = ready.min_uid,
            next_ts = ready.min_ts,
            "lease manager ready"
        );
        Ok(manager)
    }

    /// Opens with the default batch sizes.
    ///
    /// # Errors
    ///
    /// See [`LeaseManager::open`].
    pub fn with_defaults(engine: Arc<dyn Engine>) -> Result<Self> {
        Self::open(engine, DEFAULT_LEASE_BATCH, DEFAULT_LEASE_BATCH)
    }

    /// Returns true if state was loaded from an earlier run.
    #[must_use]
    pub fn restarted(&self) -> bool {
        self.restarted
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn state(&self) -> LeaseState {
        *self.state.lock()
    }

    /// Hands out one entity id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lease`] if a new batch is needed and cannot be
    /// persisted.
    pub fn next_uid(&self) -> Result<Uid> {
        self.next_uids(1, false).map(|range| range.start)
    }

    /// Hands out a range of entity ids.
    ///
    /// Without `bump`, returns `count` consecutive ids. With `bump`, `count`
    /// is a floor: if the next id is already at or above it a single id is
    /// returned, otherwise every id up to and including the floor is
    /// consumed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lease`] for a zero count or when a new batch cannot
    /// be persisted. The counters are unchanged on error.
    pub fn next_uids(&self, count: u64, bump: bool) -> Result<UidRange> {
        let mut state = self.state.lock();
        self.lease_uids(&mut state, count, bump)
    }

    /// Makes sure `uid` is never handed out, for ids chosen by the caller.
    ///
    /// Ids below the next id are already spoken for and leave the counters
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lease`] when the id space is exhausted or a new
    /// batch cannot be persisted.
    pub fn reserve_uid(&self, uid: Uid) -> Result<()> {
        let mut state = self.state.lock();
        if uid.as_u64() < state.min_uid {
            return Ok(());
        }
        self.lease_uids(&mut state, uid.as_u64(), true)?;
        tracing::debug!(%uid, "reserved caller-assigned uid");
        Ok(())
    }

    fn lease_uids(&self, state: &mut LeaseState, count: u64, bump: bool) -> Result<UidRange> {
        let start = state.min_uid;
        let end = if bump {
            start.max(count)
        } else {
            if count == 0 {
                return Err(Error::Lease("cannot lease 0 uids".to_string()));
            }
            (count - 1)
                .checked_add(start)
                .ok_or_else(|| uid_overflow(count))?
        };
        let next = end.checked_add(1).ok_or_else(|| uid_overflow(count))?;

        if next >= state.max_uid {
            self.extend_uids(state, next)
                .map_err(|e| Error::Lease(format!("error leasing uids: {e}")))?;
        }
        state.min_uid = next;
        self.engine.bump_max_uid(Uid::new(end));

        Ok(UidRange {
            start: Uid::new(start),
            end: Uid::new(end),
        })
    }

    /// Hands out one transaction timestamp and publishes it to the engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lease`] if a new batch is needed and cannot be
    /// persisted.
    pub fn next_ts(&self) -> Result<Timestamp> {
        let mut state = self.state.lock();
        if state.min_ts >= state.max_ts {
            let from = state.min_ts;
            self.extend_ts(&mut state, from)
                .map_err(|e| Error::Lease(format!("error leasing timestamps: {e}")))?;
        }
        let ts = Timestamp::new(state.min_ts);
        state.min_ts += 1;
        self.engine.publish_max_assigned(ts);
        Ok(ts)
    }

    /// Returns the newest timestamp already handed out.
    #[must_use]
    pub fn read_ts(&self) -> Timestamp {
        Timestamp::new(self.state.lock().min_ts - 1)
    }

    /// Hands out a new namespace id. Every call is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lease`] if the new id cannot be persisted.
    pub fn next_namespace_id(&self) -> Result<NamespaceId> {
        let mut state = self.state.lock();
        let mut next = *state;
        next.last_ns += 1;
        self.persist(&next)
            .map_err(|e| Error::Lease(format!("error leasing namespace id: {e}")))?;
        state.last_ns = next.last_ns;
        Ok(NamespaceId::new(next.last_ns))
    }

    /// Extends the id batch to end `uid_batch` past `from`, if needed.
    fn extend_uids(&self, state: &mut LeaseState, from: u64) -> Result<()> {
        let max_uid = from
            .checked_add(self.uid_batch)
            .ok_or_else(|| Error::Lease("uid space exhausted".to_string()))?;
        if max_uid <= state.max_uid {
            return Ok(());
        }
        let mut next = *state;
        next.max_uid = max_uid;
        self.persist(&next)?;
        tracing::debug!(max_uid = next.max_uid, "leased uid batch");
        state.max_uid = next.max_uid;
        Ok(())
    }

    /// Extends the timestamp batch to end `ts_batch` past `from`, if needed.
    fn extend_ts(&self, state: &mut LeaseState, from: u64) -> Result<()> {
        let max_ts = from
            .checked_add(self.ts_batch)
            .ok_or_else(|| Error::Lease("timestamp space exhausted".to_string()))?;
        if max_ts <= state.max_ts {
            return Ok(());
        }
        let mut next = *state;
        next.max_ts = max_ts;
        self.persist(&next)?;
        tracing::debug!(max_ts = next.max_ts, "leased timestamp batch");
        state.max_ts = next.max_ts;
        Ok(())
    }

    fn persist(&self, state: &LeaseState) -> Result<()> {
        let data = bincode::serde::encode_to_vec(state.persisted(), bincode::config::standard())
            .map_err(|e| Error::Serialization(e.to_string()))?;
        self.engine.write_reserved(RESERVED_UID, RESERVED_TS, &data)
    }
}

fn uid_overflow(count: u64) -> Error {
    Error::Lease(format!("cannot lease {count} uids: uid space exhausted"))
}

fn read_persisted(engine: &dyn Engine) -> Result<Option<PersistedLease>> {
    let Some(data) = engine.read_reserved(RESERVED_UID)? else {
        return Ok(None);
    };
    let (persisted, _): (PersistedLease, _) =
        bincode::serde::decode_from_slice(&data, bincode::config::standard())
            .map_err(|e| Error::Serialization(format!("lease state: {e}")))?;
    Ok(Some(persisted))
}

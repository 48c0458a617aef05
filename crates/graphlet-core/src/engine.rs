//! The storage engine contract.
//!
//! The mapping layer treats the engine as a black box: it alters schema,
//! stages and commits mutations under a two-timestamp protocol, evaluates
//! query text to JSON, and exposes the oracle counters the lease layer
//! primes and advances. [`Engine`] is that contract.

use graphlet_common::types::{Mutation, NamespaceId, SchemaUpdate, Timestamp, Uid};
use graphlet_common::utils::context::CallContext;
use graphlet_common::utils::error::Result;

/// Entity id of the reserved lease-state record.
pub const RESERVED_UID: Uid = Uid::new(1);

/// Timestamp the reserved lease-state record is written at.
pub const RESERVED_TS: Timestamp = Timestamp::new(2);

/// A transactional graph storage engine.
///
/// Implementations must be safe to share across threads. Every method that
/// takes a [`CallContext`] checks it on entry.
pub trait Engine: Send + Sync {
    /// Installs predicate types and index directives in a namespace.
    fn alter_schema(
        &self,
        ctx: &CallContext,
        namespace: NamespaceId,
        updates: &[SchemaUpdate],
    ) -> Result<()>;

    /// Stages a mutation at `start_ts`. Staged data is invisible to readers
    /// until committed.
    fn apply_mutation(
        &self,
        ctx: &CallContext,
        namespace: NamespaceId,
        mutation: &Mutation,
        start_ts: Timestamp,
    ) -> Result<()>;

    /// Makes the mutation staged at `start_ts` visible at `commit_ts` and
    /// publishes `commit_ts`.
    fn commit(&self, ctx: &CallContext, start_ts: Timestamp, commit_ts: Timestamp) -> Result<()>;

    /// Discards whatever is staged at `start_ts`.
    fn abort(&self, start_ts: Timestamp);

    /// Evaluates query text against the snapshot at `read_ts`.
    fn query(
        &self,
        ctx: &CallContext,
        namespace: NamespaceId,
        query: &str,
        read_ts: Timestamp,
    ) -> Result<serde_json::Value>;

    /// Returns the highest timestamp visible to readers.
    fn max_assigned(&self) -> Timestamp;

    /// Raises the highest timestamp visible to readers.
    fn publish_max_assigned(&self, ts: Timestamp);

    /// Raises the entity-id ceiling so ids at or below `uid` are never
    /// handed out for other purposes.
    fn bump_max_uid(&self, uid: Uid);

    /// Reads a reserved record.
    fn read_reserved(&self, key: Uid) -> Result<Option<Vec<u8>>>;

    /// Durably writes a reserved record at timestamp `ts`.
    fn write_reserved(&self, key: Uid, ts: Timestamp, data: &[u8]) -> Result<()>;

    /// Removes all data and schema of a namespace.
    fn drop_namespace(&self, namespace: NamespaceId) -> Result<()>;

    /// Removes all data and schema of every namespace.
    fn drop_all(&self) -> Result<()>;

    /// Flushes anything buffered to durable storage.
    fn sync(&self) -> Result<()>;
}

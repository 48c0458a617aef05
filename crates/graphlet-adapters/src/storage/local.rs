//! The bundled engine: an in-process triple store with an optional WAL.
//!
//! Mutations are type-checked and staged per start timestamp. Commit
//! checks unique constraints, appends the prepared mutation to the WAL, and
//! only then makes it visible at the commit timestamp. Recovery replays the
//! WAL in order; since only committed work is logged, every record applies.

use std::path::Path;

use graphlet_common::types::{Mutation, NamespaceId, SchemaUpdate, Timestamp, Uid};
use graphlet_common::utils::context::CallContext;
use graphlet_common::utils::error::{Error, Result, StorageError};
use graphlet_common::utils::hash::FxHashMap;
use graphlet_core::{Engine, Oracle, TripleStore};
use parking_lot::{Mutex, RwLock};

use super::wal::{DurabilityMode, WalManager, WalRecord, WalRecovery};
use crate::query::dql::{self, DEFAULT_NORMALIZE_LIMIT, Executor};

/// File name of the WAL inside a data directory.
pub const WAL_FILE: &str = "wal";

/// In-process [`Engine`] implementation.
pub struct LocalEngine {
    store: TripleStore,
    oracle: Oracle,
    staged: Mutex<FxHashMap<Timestamp, (NamespaceId, Mutation)>>,
    reserved: RwLock<FxHashMap<Uid, (Timestamp, Vec<u8>)>>,
    /// Serializes commits, schema changes and drops so WAL order matches
    /// apply order.
    commit_lock: Mutex<()>,
    wal: Option<WalManager>,
    normalize_limit: usize,
}

impl LocalEngine {
    /// Creates a volatile engine. Nothing survives the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_wal(None)
    }

    /// Opens a durable engine in `dir`, replaying its WAL.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or WAL cannot be opened, or a
    /// logged record no longer applies.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(dir, DurabilityMode::default())
    }

    /// Opens a durable engine with an explicit WAL durability mode.
    ///
    /// # Errors
    ///
    /// See [`LocalEngine::open`].
    pub fn open_with(dir: impl AsRef<Path>, durability: DurabilityMode) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let wal_path = dir.join(WAL_FILE);

        let recovered = WalRecovery::new(&wal_path).recover_and_truncate()?;
        let engine = Self::with_wal(Some(WalManager::with_durability(&wal_path, durability)?));

        let count = recovered.records.len();
        for record in recovered.records {
            engine.replay(record)?;
        }
        tracing::info!(
            path = %dir.display(),
            records = count,
            max_assigned = engine.oracle.max_assigned().as_u64(),
            "engine recovered"
        );
        Ok(engine)
    }

    fn with_wal(wal: Option<WalManager>) -> Self {
        Self {
            store: TripleStore::new(),
            oracle: Oracle::new(),
            staged: Mutex::new(FxHashMap::default()),
            reserved: RwLock::new(FxHashMap::default()),
            commit_lock: Mutex::new(()),
            wal,
            normalize_limit: DEFAULT_NORMALIZE_LIMIT,
        }
    }

    /// Sets the cap on rows produced by a `@normalize` query block.
    #[must_use]
    pub fn with_normalize_limit(mut self, limit: usize) -> Self {
        self.normalize_limit = limit;
        self
    }

    /// Returns true if writes are logged.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.wal.is_some()
    }

    /// Returns the highest entity id reserved by the lease layer.
    #[must_use]
    pub fn max_uid(&self) -> Uid {
        self.oracle.max_uid()
    }

    /// Returns the number of namespaces holding data or schema.
    #[must_use]
    pub fn namespace_count(&self) -> usize {
        self.store.namespace_count()
    }

    /// Syncs and releases the WAL. Later writes fail.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails.
    pub fn close(&self) -> Result<()> {
        self.staged.lock().clear();
        match &self.wal {
            Some(wal) => wal.close(),
            None => Ok(()),
        }
    }

    fn log(&self, record: &WalRecord) -> Result<()> {
        match &self.wal {
            Some(wal) => wal.log(record),
            None => Ok(()),
        }
    }

    fn replay(&self, record: WalRecord) -> Result<()> {
        match record {
            WalRecord::Schema { namespace, updates } => {
                self.store.namespace(namespace).alter_schema(&updates)?;
            }
            WalRecord::Commit {
                namespace,
                commit_ts,
                mutation,
            } => {
                let ns = self.store.namespace(namespace);
                // Re-preparing installs the implicit schema the original
                // prepare created.
                let prepared = ns.prepare(&mutation)?;
                ns.apply(&prepared, commit_ts)?;
                self.oracle.publish(commit_ts);
            }
            WalRecord::Reserved { key, ts, data } => {
                self.reserved.write().insert(key, (ts, data));
            }
            WalRecord::DropNamespace { namespace } => self.store.drop_namespace(namespace),
            WalRecord::DropAll => self.store.drop_all(),
        }
        Ok(())
    }
}

impl Engine for LocalEngine {
    fn alter_schema(
        &self,
        ctx: &CallContext,
        namespace: NamespaceId,
        updates: &[SchemaUpdate],
    ) -> Result<()> {
        ctx.check()?;
        let _guard = self.commit_lock.lock();
        self.store.namespace(namespace).alter_schema(updates)?;
        self.log(&WalRecord::Schema {
            namespace,
            updates: updates.to_vec(),
        })?;
        tracing::debug!(%namespace, count = updates.len(), "schema altered");
        Ok(())
    }

    fn apply_mutation(
        &self,
        ctx: &CallContext,
        namespace: NamespaceId,
        mutation: &Mutation,
        start_ts: Timestamp,
    ) -> Result<()> {
        ctx.check()?;
        let prepared = self.store.namespace(namespace).prepare(mutation)?;
        let mut staged = self.staged.lock();
        let entry = staged
            .entry(start_ts)
            .or_insert_with(|| (namespace, Mutation::new()));
        if entry.0 != namespace {
            return Err(Error::Internal(format!(
                "transaction {start_ts} already writes to {}",
                entry.0
            )));
        }
        entry.1.set.extend(prepared.set);
        entry.1.del.extend(prepared.del);
        Ok(())
    }

    fn commit(&self, ctx: &CallContext, start_ts: Timestamp, commit_ts: Timestamp) -> Result<()> {
        ctx.check()?;
        if commit_ts <= start_ts {
            return Err(StorageError::InvalidCommit {
                start: start_ts.as_u64(),
                commit: commit_ts.as_u64(),
            }
            .into());
        }
        let _guard = self.commit_lock.lock();
        let (namespace, mutation) = self
            .staged
            .lock()
            .remove(&start_ts)
            .ok_or(StorageError::UnknownTransaction(start_ts.as_u64()))?;

        let ns = self.store.namespace(namespace);
        ns.validate(&mutation)?;
        self.log(&WalRecord::Commit {
            namespace,
            commit_ts,
            mutation: mutation.clone(),
        })?;
        ns.apply(&mutation, commit_ts)?;
        self.oracle.publish(commit_ts);
        tracing::trace!(%namespace, start = start_ts.as_u64(), commit = commit_ts.as_u64(), "committed");
        Ok(())
    }

    fn abort(&self, start_ts: Timestamp) {
        self.staged.lock().remove(&start_ts);
    }

    fn query(
        &self,
        ctx: &CallContext,
        namespace: NamespaceId,
        query: &str,
        read_ts: Timestamp,
    ) -> Result<serde_json::Value> {
        ctx.check()?;
        let request = dql::parse(query)?;
        let ns = self.store.namespace(namespace);
        let result = Executor::new(&ns, read_ts)
            .with_normalize_limit(self.normalize_limit)
            .execute(&request)?;
        ctx.check()?;
        Ok(result)
    }

    fn max_assigned(&self) -> Timestamp {
        self.oracle.max_assigned()
    }

    fn publish_max_assigned(&self, ts: Timestamp) {
        self.oracle.publish(ts);
    }

    fn bump_max_uid(&self, uid: Uid) {
        self.oracle.bump_max_uid(uid);
    }

    fn read_reserved(&self, key: Uid) -> Result<Option<Vec<u8>>> {
        Ok(self.reserved.read().get(&key).map(|(_, data)| data.clone()))
    }

    fn write_reserved(&self, key: Uid, ts: Timestamp, data: &[u8]) -> Result<()> {
        let _guard = self.commit_lock.lock();
        self.log(&WalRecord::Reserved {
            key,
            ts,
            data: data.to_vec(),
        })?;
        self.reserved.write().insert(key, (ts, data.to_vec()));
        Ok(())
    }

    fn drop_namespace(&self, namespace: NamespaceId) -> Result<()> {
        let _guard = self.commit_lock.lock();
        self.log(&WalRecord::DropNamespace { namespace })?;
        self.store.drop_namespace(namespace);
        self.staged.lock().retain(|_, (ns, _)| *ns != namespace);
        tracing::info!(%namespace, "namespace dropped");
        Ok(())
    }

    fn drop_all(&self) -> Result<()> {
        let _guard = self.commit_lock.lock();
        self.log(&WalRecord::DropAll)?;
        self.store.drop_all();
        self.staged.lock().clear();
        tracing::info!("all namespaces dropped");
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        match &self.wal {
            Some(wal) => wal.sync(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphlet_common::types::{Triple, ValueKind};
    use tempfile::tempdir;

    fn ctx() -> CallContext {
        CallContext::background()
    }

    fn ts(v: u64) -> Timestamp {
        Timestamp::new(v)
    }

    fn name_mutation(uid: u64, name: &str) -> Mutation {
        Mutation {
            set: vec![
                Triple::new(Uid::new(uid), "dgraph.type", "User"),
                Triple::new(Uid::new(uid), "User.name", name),
            ],
            del: Vec::new(),
        }
    }

    fn names(engine: &LocalEngine, read_ts: u64) -> serde_json::Value {
        engine
            .query(
                &ctx(),
                NamespaceId::DEFAULT,
                r#"{ q(func: type("User")) { User.name } }"#,
                ts(read_ts),
            )
            .unwrap()["q"]
            .clone()
    }

    #[test]
    fn test_staged_data_is_invisible_until_commit() {
        let engine = LocalEngine::in_memory();
        engine
            .apply_mutation(&ctx(), NamespaceId::DEFAULT, &name_mutation(2, "A"), ts(3))
            .unwrap();
        assert_eq!(names(&engine, 10), serde_json::json!([]));

        engine.commit(&ctx(), ts(3), ts(4)).unwrap();
        assert_eq!(engine.max_assigned(), ts(4));
        assert_eq!(names(&engine, 4), serde_json::json!([{ "User.name": "A" }]));
        assert_eq!(names(&engine, 3), serde_json::json!([]));
    }

    #[test]
    fn test_commit_errors() {
        let engine = LocalEngine::in_memory();
        assert!(matches!(
            engine.commit(&ctx(), ts(3), ts(4)),
            Err(Error::Storage(StorageError::UnknownTransaction(3)))
        ));
        assert!(matches!(
            engine.commit(&ctx(), ts(5), ts(5)),
            Err(Error::Storage(StorageError::InvalidCommit { .. }))
        ));

        engine
            .apply_mutation(&ctx(), NamespaceId::DEFAULT, &name_mutation(2, "A"), ts(3))
            .unwrap();
        engine.abort(ts(3));
        assert!(engine.commit(&ctx(), ts(3), ts(4)).is_err());
    }

    #[test]
    fn test_cancelled_context_is_rejected() {
        let engine = LocalEngine::in_memory();
        let (ctx, cancel) = ctx().with_cancel();
        cancel.cancel();
        assert!(matches!(
            engine.query(&ctx, NamespaceId::DEFAULT, "{ q(func: uid(0x1)) { uid } }", ts(1)),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let engine = LocalEngine::in_memory();
        let other = NamespaceId::new(7);
        engine
            .apply_mutation(&ctx(), other, &name_mutation(2, "A"), ts(3))
            .unwrap();
        engine.commit(&ctx(), ts(3), ts(4)).unwrap();
        assert_eq!(names(&engine, 4), serde_json::json!([]));

        engine.drop_namespace(other).unwrap();
        let result = engine
            .query(&ctx(), other, r#"{ q(func: type("User")) { uid } }"#, ts(4))
            .unwrap();
        assert_eq!(result["q"], serde_json::json!([]));
    }

    #[test]
    fn test_reopen_replays_wal() {
        let dir = tempdir().unwrap();
        {
            let engine = LocalEngine::open(dir.path()).unwrap();
            engine
                .alter_schema(
                    &ctx(),
                    NamespaceId::DEFAULT,
                    &[SchemaUpdate::new("User.name", ValueKind::String).with_unique()],
                )
                .unwrap();
            engine
                .apply_mutation(&ctx(), NamespaceId::DEFAULT, &name_mutation(2, "A"), ts(3))
                .unwrap();
            engine.commit(&ctx(), ts(3), ts(4)).unwrap();

            // Rejected by the unique check, so never logged.
            engine
                .apply_mutation(&ctx(), NamespaceId::DEFAULT, &name_mutation(3, "A"), ts(5))
                .unwrap();
            assert!(engine.commit(&ctx(), ts(5), ts(6)).is_err());

            engine
                .write_reserved(Uid::new(1), ts(2), b"lease-state")
                .unwrap();
            engine.close().unwrap();
        }

        let engine = LocalEngine::open(dir.path()).unwrap();
        assert_eq!(engine.max_assigned(), ts(4));
        assert_eq!(names(&engine, 10), serde_json::json!([{ "User.name": "A" }]));
        assert!(engine.store.namespace(NamespaceId::DEFAULT).predicate("User.name").unwrap().unique);
        assert_eq!(
            engine.read_reserved(Uid::new(1)).unwrap(),
            Some(b"lease-state".to_vec())
        );
    }

    #[test]
    fn test_drop_all_keeps_reserved() {
        let engine = LocalEngine::in_memory();
        engine.write_reserved(Uid::new(1), ts(2), b"x").unwrap();
        engine
            .apply_mutation(&ctx(), NamespaceId::DEFAULT, &name_mutation(2, "A"), ts(3))
            .unwrap();
        engine.commit(&ctx(), ts(3), ts(4)).unwrap();

        engine.drop_all().unwrap();
        assert_eq!(names(&engine, 4), serde_json::json!([]));
        assert!(engine.read_reserved(Uid::new(1)).unwrap().is_some());
    }
}

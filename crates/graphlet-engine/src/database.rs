//! The database handle.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use graphlet_adapters::LocalEngine;
use graphlet_common::types::{NamespaceId, Record, Uid};
use graphlet_common::utils::error::{Error, Result, ValidationError};
use graphlet_common::utils::hash::FxHashMap;
use graphlet_core::Engine;

use crate::config::Config;
use crate::lease::LeaseManager;
use crate::namespace::Namespace;
use crate::object::Object;
use crate::options::Options;
use crate::query_builder::{Lookup, QueryParams};
use crate::schema::SchemaResolver;

/// An embedded graph database.
///
/// Every operation targets a namespace: the default one unless
/// [`Options::namespace`] names another. Writes are serialized by a
/// database-wide lock; reads run concurrently.
///
/// # Examples
///
/// ```
/// use graphlet_engine::{graph_object, Database, Options, Uid};
///
/// graph_object! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct User {
///         #[uid]
///         pub uid: Uid,
///         pub name: String,
///         #[index(exact)]
///         pub email: String,
///     }
/// }
///
/// let db = Database::in_memory().unwrap();
/// let mut user = User { name: "A".into(), email: "a@x.io".into(), ..User::default() };
/// let uid = db.create(&mut user, &Options::default()).unwrap();
/// assert_eq!(user.uid, uid);
///
/// let (_, fetched) = db.get::<User>(uid, &Options::default()).unwrap();
/// assert_eq!(fetched, user);
/// ```
pub struct Database {
    config: Config,
    pub(crate) engine: Arc<dyn Engine>,
    pub(crate) leases: LeaseManager,
    pub(crate) resolver: SchemaResolver,
    /// Serializes id allocation, link resolution and mutation application.
    pub(crate) write_lock: Mutex<()>,
    /// Per-namespace gates; teardown holds the write side.
    gates: RwLock<FxHashMap<NamespaceId, Arc<RwLock<()>>>>,
    is_open: RwLock<bool>,
}

impl Database {
    /// Creates a volatile database.
    ///
    /// # Errors
    ///
    /// Returns an error if the lease state cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let config = Config::in_memory();
        let engine =
            LocalEngine::in_memory().with_normalize_limit(config.limit_normalize_node);
        Self::with_engine(config, Arc::new(engine))
    }

    /// Opens or creates the database described by `config`.
    ///
    /// With the WAL enabled, an existing directory is recovered first and
    /// leasing resumes past every id and timestamp handed out before.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDataDir`] if `config` has no data
    /// directory, and an error if recovery or lease initialization fails.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let Some(dir) = config.data_dir.clone() else {
            return Err(ValidationError::EmptyDataDir.into());
        };
        let engine = if config.wal_enabled {
            LocalEngine::open(&dir)?
        } else {
            std::fs::create_dir_all(&dir)?;
            LocalEngine::in_memory()
        };
        let engine = engine.with_normalize_limit(config.limit_normalize_node);
        Self::with_engine(config, Arc::new(engine))
    }

    /// Creates a database over an existing engine.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the lease state cannot be
    /// read from `engine`.
    pub fn with_engine(config: Config, engine: Arc<dyn Engine>) -> Result<Self> {
        config.validate()?;
        let leases = LeaseManager::open(
            Arc::clone(&engine),
            config.uid_lease_batch,
            config.ts_lease_batch,
        )?;
        tracing::info!(
            durable = config.is_durable(),
            restarted = leases.restarted(),
            "database opened"
        );
        Ok(Self {
            config,
            engine,
            leases,
            resolver: SchemaResolver::new(),
            write_lock: Mutex::new(()),
            gates: RwLock::new(FxHashMap::default()),
            is_open: RwLock::new(true),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the lease manager.
    #[must_use]
    pub fn leases(&self) -> &LeaseManager {
        &self.leases
    }

    /// Returns true until [`Database::close`] is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.is_open() { Ok(()) } else { Err(Error::Closed) }
    }

    /// Returns the default namespace.
    #[must_use]
    pub fn default_namespace(&self) -> Namespace<'_> {
        Namespace::new(self, NamespaceId::DEFAULT, self.gate(NamespaceId::DEFAULT))
    }

    /// Returns an existing namespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NamespaceNotFound`] for an id never handed out, and
    /// [`Error::Closed`] after close.
    pub fn namespace(&self, id: NamespaceId) -> Result<Namespace<'_>> {
        self.check_open()?;
        if id.as_u64() > self.leases.state().last_ns {
            return Err(Error::NamespaceNotFound(id.as_u64()));
        }
        Ok(Namespace::new(self, id, self.gate(id)))
    }

    /// Creates a namespace with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lease`] if the id cannot be persisted, and
    /// [`Error::Closed`] after close.
    pub fn create_namespace(&self) -> Result<Namespace<'_>> {
        self.check_open()?;
        let _write = self.write_lock.lock();
        let id = self.leases.next_namespace_id()?;
        tracing::info!(namespace = id.as_u64(), "created namespace");
        Ok(Namespace::new(self, id, self.gate(id)))
    }

    fn gate(&self, id: NamespaceId) -> Arc<RwLock<()>> {
        if let Some(gate) = self.gates.read().get(&id) {
            return Arc::clone(gate);
        }
        Arc::clone(self.gates.write().entry(id).or_default())
    }

    fn target(&self, opts: &Options) -> Result<Namespace<'_>> {
        let ns = match opts.namespace {
            None => self.default_namespace(),
            Some(id) => self.namespace(id)?,
        };
        Ok(ns.with_context(opts.context.clone()))
    }

    /// Creates `object` and its new nested objects, stamping the assigned
    /// ids into it.
    ///
    /// # Errors
    ///
    /// See [`Namespace::create`].
    pub fn create<T: Object>(&self, object: &mut T, opts: &Options) -> Result<Uid> {
        self.target(opts)?.create(object)
    }

    /// Fetches one object by id or by an indexed field.
    ///
    /// # Errors
    ///
    /// See [`Namespace::get`].
    pub fn get<T: Object>(&self, key: impl Into<Lookup>, opts: &Options) -> Result<(Uid, T)> {
        self.target(opts)?.get(key)
    }

    /// Creates `object`, or updates the entity it identifies. Returns the
    /// id and whether a new entity was created.
    ///
    /// # Errors
    ///
    /// See [`Namespace::upsert`].
    pub fn upsert<T: Object>(&self, object: &mut T, opts: &Options) -> Result<(Uid, bool)> {
        self.target(opts)?.upsert(object)
    }

    /// Deletes one object, returning its id and last state.
    ///
    /// # Errors
    ///
    /// See [`Namespace::delete`].
    pub fn delete<T: Object>(&self, key: impl Into<Lookup>, opts: &Options) -> Result<(Uid, T)> {
        self.target(opts)?.delete(key)
    }

    /// Queries objects of type `T`.
    ///
    /// # Errors
    ///
    /// See [`Namespace::query`].
    pub fn query<T: Object>(&self, params: &QueryParams, opts: &Options) -> Result<Vec<(Uid, T)>> {
        self.target(opts)?.query(params)
    }

    /// Creates an untyped entity.
    ///
    /// # Errors
    ///
    /// See [`Namespace::raw_create`].
    pub fn raw_create<K, V>(
        &self,
        record: &mut Record,
        constraints: impl IntoIterator<Item = (K, V)>,
        opts: &Options,
    ) -> Result<Uid>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.target(opts)?.raw_create(record, constraints)
    }

    /// Fetches an untyped entity.
    ///
    /// # Errors
    ///
    /// See [`Namespace::raw_get`].
    pub fn raw_get(&self, key: impl Into<Lookup>, opts: &Options) -> Result<Record> {
        self.target(opts)?.raw_get(key)
    }

    /// Deletes an untyped entity.
    ///
    /// # Errors
    ///
    /// See [`Namespace::raw_delete`].
    pub fn raw_delete(&self, key: impl Into<Lookup>, opts: &Options) -> Result<Uid> {
        self.target(opts)?.raw_delete(key)
    }

    /// Bulk-loads a schema file and an N-Quad data file.
    ///
    /// # Errors
    ///
    /// See [`Namespace::load`].
    pub fn load(
        &self,
        schema_path: impl AsRef<Path>,
        data_path: impl AsRef<Path>,
        opts: &Options,
    ) -> Result<usize> {
        self.target(opts)?.load(schema_path, data_path)
    }

    /// Drops the data and schema of every namespace. Namespace ids stay
    /// allocated.
    ///
    /// # Errors
    ///
    /// Returns an engine error, or [`Error::Closed`] after close.
    pub fn drop_all(&self) -> Result<()> {
        let _write = self.write_lock.lock();
        self.check_open()?;
        let gates: Vec<_> = self.gates.read().values().cloned().collect();
        let _held: Vec<_> = gates.iter().map(|gate| gate.write()).collect();
        self.engine
            .drop_all()
            .map_err(|e| Error::engine("drop all", e))?;
        tracing::info!("dropped all data");
        Ok(())
    }

    /// Closes the database, syncing the engine.
    ///
    /// Later operations fail with [`Error::Closed`]. Closing twice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails.
    pub fn close(&self) -> Result<()> {
        let _write = self.write_lock.lock();
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }
        self.engine.sync()?;
        *is_open = false;
        tracing::info!("database closed");
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("Error closing database: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_object;
    use crate::query_builder::ConstrainedField;

    graph_object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Team {
            #[uid]
            uid: Uid,
            #[index(exact)]
            name: String,
        }
    }

    #[test]
    fn test_in_memory_starts_past_reserved_ids() {
        let db = Database::in_memory().unwrap();
        let mut team = Team {
            name: "core".into(),
            ..Team::default()
        };
        let uid = db.create(&mut team, &Options::default()).unwrap();
        assert_eq!(uid, Uid::new(2));
        assert_eq!(team.uid, uid);
    }

    #[test]
    fn test_open_requires_dir() {
        let err = Database::open(Config::in_memory()).err().unwrap();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::EmptyDataDir)
        ));
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let db = Database::in_memory().unwrap();
        let ns = db.create_namespace().unwrap();
        assert_eq!(ns.id(), NamespaceId::new(1));

        let mut team = Team {
            name: "core".into(),
            ..Team::default()
        };
        let uid = db
            .create(&mut team, &Options::namespace(ns.id()))
            .unwrap();

        let key = ConstrainedField::new("name", "core");
        assert!(
            db.get::<Team>(key.clone(), &Options::default())
                .unwrap_err()
                .is_not_found()
        );
        let (found, _) = db.get::<Team>(key, &Options::namespace(ns.id())).unwrap();
        assert_eq!(found, uid);
    }

    #[test]
    fn test_unknown_namespace() {
        let db = Database::in_memory().unwrap();
        let err = db
            .get::<Team>(Uid::new(2), &Options::namespace(NamespaceId::new(7)))
            .unwrap_err();
        assert_eq!(err.to_string(), "namespace 7 not found");
    }

    #[test]
    fn test_closed_database() {
        let db = Database::in_memory().unwrap();
        db.close().unwrap();
        db.close().unwrap();
        let mut team = Team {
            name: "x".into(),
            ..Team::default()
        };
        assert!(matches!(
            db.create(&mut team, &Options::default()),
            Err(Error::Closed)
        ));
        assert!(matches!(
            db.get::<Team>(Uid::new(2), &Options::default()),
            Err(Error::Closed)
        ));
        assert!(matches!(db.create_namespace(), Err(Error::Closed)));
    }

    #[test]
    fn test_drop_all() {
        let db = Database::in_memory().unwrap();
        let mut team = Team {
            name: "core".into(),
            ..Team::default()
        };
        let uid = db.create(&mut team, &Options::default()).unwrap();
        db.drop_all().unwrap();
        assert!(
            db.get::<Team>(uid, &Options::default())
                .unwrap_err()
                .is_not_found()
        );
    }
}

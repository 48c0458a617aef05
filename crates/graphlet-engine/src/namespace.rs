//! Namespace-scoped operations.
//!
//! A [`Namespace`] sequences the lease manager, the mappers, the query
//! builder and the engine for one isolation scope. Writes run under the
//! database write lock with the two-timestamp commit protocol: schema is
//! altered first, then the mutation is staged at a start timestamp and
//! committed at a later one.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::RwLock;
use serde_json::Value as Json;

use graphlet_adapters::query::rdf::{Node, Object as RdfObject};
use graphlet_adapters::query::{parse_nquads, parse_schema};
use graphlet_common::types::{Mutation, NamespaceId, Record, SchemaUpdate, Triple, Uid, Value};
use graphlet_common::utils::context::CallContext;
use graphlet_common::utils::error::{Error, Result, ValidationError};
use graphlet_common::utils::hash::FxHashMap;

use crate::database::Database;
use crate::mapper::{LinkLookup, ObjectMapper, ResultMapper, Target};
use crate::object::Object;
use crate::query_builder::{
    self, ConstrainedField, Lookup, OBJ_BLOCK, OBJS_BLOCK, QueryParams,
};
use crate::schema::{ResolvedType, resolve_raw};

/// Statements committed per transaction by [`Namespace::load`].
pub const LOAD_BATCH: usize = 1000;

/// One isolation scope of a [`Database`].
pub struct Namespace<'db> {
    db: &'db Database,
    id: NamespaceId,
    gate: Arc<RwLock<()>>,
    context: CallContext,
}

impl<'db> Namespace<'db> {
    pub(crate) fn new(db: &'db Database, id: NamespaceId, gate: Arc<RwLock<()>>) -> Self {
        Self {
            db,
            id,
            gate,
            context: CallContext::background(),
        }
    }

    /// Runs later calls under `context`.
    #[must_use]
    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    /// Returns the namespace id.
    #[must_use]
    pub fn id(&self) -> NamespaceId {
        self.id
    }

    /// Creates `object` and its new nested objects.
    ///
    /// Nested objects with an id are linked; nested objects matching an
    /// existing entity on a link-key field are linked to it instead of
    /// being duplicated. On success every assigned id is stamped into
    /// `object`.
    ///
    /// # Errors
    ///
    /// Returns validation errors for types without an indexed field or
    /// values that do not fit their field, lease errors, engine errors
    /// wrapped with the failing operation, [`Error::Cancelled`] and
    /// [`Error::Closed`].
    pub fn create<T: Object>(&self, object: &mut T) -> Result<Uid> {
        let _write = self.db.write_lock.lock();
        let _gate = self.gate.read();
        self.db.check_open()?;
        self.context.check()?;

        let resolved = self.db.resolver.resolve(T::descriptor())?;
        let uid = self.write_object(object, &resolved, Target::New)?;
        tracing::debug!(namespace = %self.id, %uid, type_name = T::descriptor().name, "created object");
        Ok(uid)
    }

    /// Fetches one object by id or by an indexed field.
    ///
    /// A field key names the declared field (`"email"`) or its predicate
    /// (`"User.email"`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when nothing matches,
    /// [`ValidationError::ConstraintNotDefined`] for a field key that is
    /// not an indexed field of `T`, and engine errors.
    pub fn get<T: Object>(&self, key: impl Into<Lookup>) -> Result<(Uid, T)> {
        let _gate = self.gate.read();
        self.db.check_open()?;
        self.get_object(&key.into())
    }

    /// Creates `object`, or updates the entity it identifies.
    ///
    /// An object with an id updates that entity, or creates it under that
    /// id if nothing is stored there. Without an id, the entity is found by
    /// the first non-empty link-key field. Scalar fields overwrite, list fields are replaced,
    /// and fields left empty keep their stored value.
    ///
    /// # Errors
    ///
    /// See [`Namespace::create`].
    pub fn upsert<T: Object>(&self, object: &mut T) -> Result<(Uid, bool)> {
        let _write = self.db.write_lock.lock();
        let _gate = self.gate.read();
        self.db.check_open()?;
        self.context.check()?;

        let resolved = self.db.resolver.resolve(T::descriptor())?;
        let record = object.encode()?;
        let existing = match record.assigned_uid() {
            Some(uid) => self.exists(uid)?.then_some(uid),
            None => self.find_linked(&resolved, &record)?,
        };

        let target = existing.map_or(Target::New, Target::Existing);
        let uid = self.write_object(object, &resolved, target)?;
        let created = existing.is_none();
        tracing::debug!(namespace = %self.id, %uid, created, "upserted object");
        Ok((uid, created))
    }

    /// Deletes one object, returning its id and the state it had.
    ///
    /// Every predicate of the entity is removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when nothing matches, and the errors of
    /// [`Namespace::get`].
    pub fn delete<T: Object>(&self, key: impl Into<Lookup>) -> Result<(Uid, T)> {
        let _write = self.db.write_lock.lock();
        let _gate = self.gate.read();
        self.db.check_open()?;

        let (uid, object) = self.get_object(&key.into())?;
        self.commit(&[], &delete_all(uid))?;
        tracing::debug!(namespace = %self.id, %uid, "deleted object");
        Ok((uid, object))
    }

    /// Queries objects of type `T`.
    ///
    /// Results come back in id order, in the requested sort order, or
    /// nearest first for a top-level similarity filter.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFilter`] for a malformed filter,
    /// and engine errors such as a text match on a field without the
    /// matching index.
    pub fn query<T: Object>(&self, params: &QueryParams) -> Result<Vec<(Uid, T)>> {
        let _gate = self.gate.read();
        self.db.check_open()?;

        let resolved = self.db.resolver.resolve(T::descriptor())?;
        let text = query_builder::objects_query(T::descriptor().name, params, &resolved.reverse)?;
        let json = self.run_query(&text)?;
        ResultMapper::new(&self.db.resolver).decode_many(&json, OBJS_BLOCK)
    }

    /// Creates an untyped entity from `record`.
    ///
    /// `constraints` maps field names to index markers (`"unique"`,
    /// `"exact"`, `"term"`, `"vector"`, ...). The id is stamped into
    /// `record` before anything is written, so it stays visible to the
    /// caller when a later step fails.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedType`] for nested objects and
    /// unknown markers, unique violations from the engine, and the errors
    /// of [`Namespace::create`].
    pub fn raw_create<K, V>(
        &self,
        record: &mut Record,
        constraints: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Uid>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let constraints: FxHashMap<String, String> = constraints
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let _write = self.db.write_lock.lock();
        let _gate = self.gate.read();
        self.db.check_open()?;
        self.context.check()?;

        let resolved = resolve_raw(record, &constraints)?;
        let uid = match record.assigned_uid() {
            Some(uid) => {
                self.db.leases.reserve_uid(uid)?;
                uid
            }
            None => self.db.leases.next_uid()?,
        };
        record.uid = Some(uid);

        let lookup = self.lookup();
        let encoded = ObjectMapper::new(&self.db.resolver, &self.db.leases, &lookup).encode(
            record.clone(),
            &resolved,
            Target::New,
        )?;
        self.commit(&encoded.schema, &encoded.mutation)?;
        tracing::debug!(namespace = %self.id, %uid, "created raw record");
        Ok(uid)
    }

    /// Fetches an untyped entity. A field key names the predicate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when nothing matches, and engine errors.
    pub fn raw_get(&self, key: impl Into<Lookup>) -> Result<Record> {
        let _gate = self.gate.read();
        self.db.check_open()?;

        let text = query_builder::unstructured_query(&raw_func(&key.into()));
        let json = self.run_query(&text)?;
        ResultMapper::new(&self.db.resolver).raw_one(&json, OBJ_BLOCK)
    }

    /// Deletes an untyped entity, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when nothing matches, and engine errors.
    pub fn raw_delete(&self, key: impl Into<Lookup>) -> Result<Uid> {
        let _write = self.db.write_lock.lock();
        let _gate = self.gate.read();
        self.db.check_open()?;

        let text = query_builder::uid_query(&raw_func(&key.into()));
        let uid = first_uid(&self.run_query(&text)?).ok_or(Error::NotFound)?;
        self.commit(&[], &delete_all(uid))?;
        tracing::debug!(namespace = %self.id, %uid, "deleted raw record");
        Ok(uid)
    }

    /// Installs schema given in the schema language, one predicate per
    /// line.
    ///
    /// # Errors
    ///
    /// Returns a query error for malformed text and engine errors, such as
    /// changing the type of a predicate that holds data.
    pub fn alter_schema(&self, text: &str) -> Result<()> {
        let updates = parse_schema(text)?;
        let _write = self.db.write_lock.lock();
        let _gate = self.gate.read();
        self.db.check_open()?;
        self.alter(&updates)
    }

    /// Bulk-loads a schema file and an N-Quad data file, returning the
    /// number of statements loaded.
    ///
    /// The schema is installed first. Blank nodes and plain numeric node
    /// ids are mapped to newly leased uids in first-seen order; `0x` ids
    /// are kept and reserved. Statements commit in batches of
    /// [`LOAD_BATCH`], so a failure leaves earlier batches in place.
    ///
    /// # Errors
    ///
    /// Returns I/O errors for unreadable files, query errors for malformed
    /// schema or data, and the errors of [`Namespace::create`].
    pub fn load(&self, schema_path: impl AsRef<Path>, data_path: impl AsRef<Path>) -> Result<usize> {
        let schema = parse_schema(&fs::read_to_string(schema_path)?)?;
        let quads = parse_nquads(&fs::read_to_string(data_path)?)?;

        let _write = self.db.write_lock.lock();
        let _gate = self.gate.read();
        self.db.check_open()?;
        self.context.check()?;
        self.alter(&schema)?;

        let mut labels: IndexSet<&str> = IndexSet::new();
        let mut max_fixed: Option<Uid> = None;
        for quad in &quads {
            let object = match &quad.object {
                RdfObject::Node(node) => Some(node),
                RdfObject::Value(_) => None,
            };
            for node in std::iter::once(&quad.subject).chain(object) {
                match node {
                    Node::Label(label) => {
                        labels.insert(label.as_str());
                    }
                    Node::Uid(uid) => max_fixed = max_fixed.max(Some(*uid)),
                }
            }
        }
        if let Some(uid) = max_fixed {
            self.db.leases.reserve_uid(uid)?;
        }
        let first = if labels.is_empty() {
            0
        } else {
            self.db.leases.next_uids(labels.len() as u64, false)?.start.as_u64()
        };
        let uid_of = |node: &Node| match node {
            Node::Uid(uid) => *uid,
            Node::Label(label) => {
                Uid::new(first + labels.get_index_of(label.as_str()).unwrap_or_default() as u64)
            }
        };

        for batch in quads.chunks(LOAD_BATCH) {
            let mut mutation = Mutation::new();
            for quad in batch {
                let object = match &quad.object {
                    RdfObject::Node(node) => Value::Uid(uid_of(node)),
                    RdfObject::Value(value) => value.clone(),
                };
                mutation
                    .set
                    .push(Triple::new(uid_of(&quad.subject), quad.predicate.clone(), object));
            }
            self.commit(&[], &mutation)?;
        }
        tracing::info!(
            namespace = %self.id,
            statements = quads.len(),
            nodes = labels.len(),
            "loaded data"
        );
        Ok(quads.len())
    }

    /// Evaluates query text and returns the engine's JSON result.
    ///
    /// # Errors
    ///
    /// Returns query errors and [`Error::Closed`].
    pub fn query_text(&self, text: &str) -> Result<Json> {
        let _gate = self.gate.read();
        self.db.check_open()?;
        self.run_query(text)
    }

    /// Drops every entity and predicate of this namespace. The namespace
    /// itself stays usable.
    ///
    /// # Errors
    ///
    /// Returns engine errors and [`Error::Closed`].
    pub fn drop_data(&self) -> Result<()> {
        let _write = self.db.write_lock.lock();
        let _gate = self.gate.write();
        self.db.check_open()?;
        self.db
            .engine
            .drop_namespace(self.id)
            .map_err(|e| Error::engine("drop namespace", e))
    }

    /// Encodes and commits `object`, then stamps its ids. The caller holds
    /// the write lock.
    fn write_object<T: Object>(
        &self,
        object: &mut T,
        resolved: &ResolvedType,
        target: Target,
    ) -> Result<Uid> {
        let lookup = self.lookup();
        let encoded = ObjectMapper::new(&self.db.resolver, &self.db.leases, &lookup).encode(
            object.encode()?,
            resolved,
            target,
        )?;
        self.commit(&encoded.schema, &encoded.mutation)?;
        *object = T::decode(&encoded.record)?;
        Ok(encoded.uid)
    }

    fn exists(&self, uid: Uid) -> Result<bool> {
        let text = query_builder::uid_query(&query_builder::uid_func(uid));
        Ok(first_uid(&self.run_query(&text)?).is_some())
    }

    fn find_linked(&self, resolved: &ResolvedType, record: &Record) -> Result<Option<Uid>> {
        let lookup = self.lookup();
        for key in resolved.link_keys() {
            let Some(value) = record.get(&key.predicate).filter(|v| !v.is_empty()) else {
                continue;
            };
            if let Some(uid) = lookup.find(&key.predicate, value)? {
                return Ok(Some(uid));
            }
        }
        Ok(None)
    }

    fn get_object<T: Object>(&self, key: &Lookup) -> Result<(Uid, T)> {
        let resolved = self.db.resolver.resolve(T::descriptor())?;
        let func = match key {
            Lookup::Uid(uid) => query_builder::uid_func(*uid),
            Lookup::Field(field) => typed_eq(&resolved, field)?,
        };
        let text = query_builder::object_query(&func, &resolved.reverse);
        let json = self.run_query(&text)?;
        ResultMapper::new(&self.db.resolver).decode_one(&json, OBJ_BLOCK)
    }

    fn alter(&self, updates: &[SchemaUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        self.context.check()?;
        self.db
            .engine
            .alter_schema(&self.context, self.id, updates)
            .map_err(|e| Error::engine("alter schema", e))?;
        tracing::debug!(namespace = %self.id, predicates = updates.len(), "altered schema");
        Ok(())
    }

    /// Alters schema, then stages and commits `mutation`.
    fn commit(&self, schema: &[SchemaUpdate], mutation: &Mutation) -> Result<()> {
        self.alter(schema)?;

        let engine = &self.db.engine;
        let start_ts = self.db.leases.next_ts()?;
        let commit_ts = self.db.leases.next_ts()?;

        self.context.check()?;
        let staged = engine
            .apply_mutation(&self.context, self.id, mutation, start_ts)
            .map_err(|e| Error::engine("apply mutation", e))
            .and_then(|()| self.context.check());
        if let Err(e) = staged {
            engine.abort(start_ts);
            return Err(e);
        }
        if let Err(e) = engine.commit(&self.context, start_ts, commit_ts) {
            engine.abort(start_ts);
            return Err(Error::engine("commit", e));
        }
        Ok(())
    }

    fn run_query(&self, text: &str) -> Result<Json> {
        self.context.check()?;
        tracing::debug!(namespace = %self.id, query = text, "running query");
        let json = self
            .db
            .engine
            .query(&self.context, self.id, text, self.db.leases.read_ts())
            .map_err(|e| Error::engine("query", e))?;
        self.context.check()?;
        Ok(json)
    }

    fn lookup(&self) -> EngineLookup<'_, 'db> {
        EngineLookup { ns: self }
    }
}

/// Resolves link keys by querying the namespace.
struct EngineLookup<'n, 'db> {
    ns: &'n Namespace<'db>,
}

impl LinkLookup for EngineLookup<'_, '_> {
    fn find(&self, predicate: &str, value: &Value) -> Result<Option<Uid>> {
        let text = query_builder::uid_query(&query_builder::eq_func(predicate, value));
        Ok(first_uid(&self.ns.run_query(&text)?))
    }
}

fn typed_eq(resolved: &ResolvedType, field: &ConstrainedField) -> Result<String> {
    let declared = resolved
        .field_named(&field.key)
        .or_else(|| resolved.field(&field.key))
        .filter(|f| f.index.is_some() && f.nested.is_none());
    match declared {
        Some(declared) => Ok(query_builder::eq_func(&declared.predicate, &field.value)),
        None => Err(ValidationError::ConstraintNotDefined(field.key.clone()).into()),
    }
}

fn raw_func(key: &Lookup) -> String {
    match key {
        Lookup::Uid(uid) => query_builder::uid_func(*uid),
        Lookup::Field(field) => query_builder::eq_func(&field.key, &field.value),
    }
}

fn first_uid(json: &Json) -> Option<Uid> {
    json.get(OBJ_BLOCK)?
        .as_array()?
        .first()?
        .get("uid")?
        .as_str()?
        .parse()
        .ok()
}

fn delete_all(uid: Uid) -> Mutation {
    Mutation {
        set: Vec::new(),
        del: vec![Triple::star(uid)],
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use graphlet_adapters::LocalEngine;
    use graphlet_common::types::{Timestamp, TYPE_PREDICATE};
    use graphlet_core::Engine;

    use super::*;
    use crate::config::Config;
    use crate::graph_object;
    use crate::options::Options;

    graph_object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct User {
            #[uid]
            uid: Uid,
            name: String,
            age: i64,
            #[index(exact)]
            clerk_id: String,
        }
    }

    /// Engine that can be told to fail commits.
    struct FailingCommits {
        inner: LocalEngine,
        fail: AtomicBool,
    }

    impl Engine for FailingCommits {
        fn alter_schema(&self, ctx: &CallContext, ns: NamespaceId, u: &[SchemaUpdate]) -> Result<()> {
            self.inner.alter_schema(ctx, ns, u)
        }
        fn apply_mutation(
            &self,
            ctx: &CallContext,
            ns: NamespaceId,
            m: &Mutation,
            start_ts: Timestamp,
        ) -> Result<()> {
            self.inner.apply_mutation(ctx, ns, m, start_ts)
        }
        fn commit(&self, ctx: &CallContext, start_ts: Timestamp, commit_ts: Timestamp) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Internal("commit refused".into()));
            }
            self.inner.commit(ctx, start_ts, commit_ts)
        }
        fn abort(&self, start_ts: Timestamp) {
            self.inner.abort(start_ts);
        }
        fn query(&self, ctx: &CallContext, ns: NamespaceId, q: &str, ts: Timestamp) -> Result<Json> {
            self.inner.query(ctx, ns, q, ts)
        }
        fn max_assigned(&self) -> Timestamp {
            self.inner.max_assigned()
        }
        fn publish_max_assigned(&self, ts: Timestamp) {
            self.inner.publish_max_assigned(ts);
        }
        fn bump_max_uid(&self, uid: Uid) {
            self.inner.bump_max_uid(uid);
        }
        fn read_reserved(&self, key: Uid) -> Result<Option<Vec<u8>>> {
            self.inner.read_reserved(key)
        }
        fn write_reserved(&self, key: Uid, ts: Timestamp, data: &[u8]) -> Result<()> {
            self.inner.write_reserved(key, ts, data)
        }
        fn drop_namespace(&self, ns: NamespaceId) -> Result<()> {
            self.inner.drop_namespace(ns)
        }
        fn drop_all(&self) -> Result<()> {
            self.inner.drop_all()
        }
        fn sync(&self) -> Result<()> {
            self.inner.sync()
        }
    }

    fn user(name: &str, age: i64, clerk_id: &str) -> User {
        User {
            name: name.into(),
            age,
            clerk_id: clerk_id.into(),
            ..User::default()
        }
    }

    #[test]
    fn test_get_by_unindexed_field() {
        let db = Database::in_memory().unwrap();
        let err = db
            .default_namespace()
            .get::<User>(ConstrainedField::new("name", "A"))
            .unwrap_err();
        assert_eq!(err.to_string(), "constraint not defined for field name");
    }

    #[test]
    fn test_get_by_predicate_name() {
        let db = Database::in_memory().unwrap();
        let ns = db.default_namespace();
        let uid = ns.create(&mut user("A", 20, "c1")).unwrap();
        let (found, fetched) = ns
            .get::<User>(ConstrainedField::new("User.clerk_id", "c1"))
            .unwrap();
        assert_eq!(found, uid);
        assert_eq!(fetched.name, "A");
    }

    #[test]
    fn test_schema_installed_before_data() {
        let db = Database::in_memory().unwrap();
        let ns = db.default_namespace();
        ns.create(&mut user("A", 20, "123")).unwrap();
        let json = ns
            .query_text("{ s(func: has(User.name)) { uid } schema(pred: [User.clerk_id]) { type index tokenizer } }")
            .unwrap();
        let schema = &json["schema"][0];
        assert_eq!(schema["predicate"], "User.clerk_id");
        assert_eq!(schema["type"], "string");
        assert_eq!(schema["tokenizer"][0], "exact");
        assert_eq!(json["s"][0]["uid"], "0x2");
    }

    #[test]
    fn test_type_membership() {
        let db = Database::in_memory().unwrap();
        let ns = db.default_namespace();
        let uid = ns.create(&mut user("A", 20, "123")).unwrap();
        let json = ns
            .query_text(&format!("{{ t(func: uid({uid})) {{ {TYPE_PREDICATE} }} }}"))
            .unwrap();
        assert_eq!(json["t"][0][TYPE_PREDICATE][0], "User");
    }

    #[test]
    fn test_failed_commit_writes_nothing() {
        let engine = Arc::new(FailingCommits {
            inner: LocalEngine::in_memory(),
            fail: AtomicBool::new(true),
        });
        let db = Database::with_engine(Config::in_memory(), engine.clone()).unwrap();
        let err = db
            .create(&mut user("A", 20, "c1"), &Options::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "commit failed: internal error: commit refused");

        engine.fail.store(false, Ordering::SeqCst);
        assert!(
            db.get::<User>(ConstrainedField::new("clerk_id", "c1"), &Options::default())
                .unwrap_err()
                .is_not_found()
        );
        // The aborted write consumed an id; it is never reused.
        let uid = db.create(&mut user("A", 20, "c1"), &Options::default()).unwrap();
        assert_eq!(uid, Uid::new(3));
    }

    #[test]
    fn test_load_maps_labels_to_new_uids() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("load.schema");
        let data = dir.path().join("load.rdf");
        fs::write(&schema, "name: string @index(term) @lang .\nfriend: [uid] @reverse .\n").unwrap();
        fs::write(
            &data,
            "_:a <name> \"Alice\"@en .\n\
             _:a <friend> <0x10> .\n\
             <0x10> <name> \"Bob\"@en .\n\
             _:b <name> \"Carol\"@fr .\n",
        )
        .unwrap();

        let db = Database::in_memory().unwrap();
        let ns = db.default_namespace();
        assert_eq!(ns.load(&schema, &data).unwrap(), 4);

        let json = ns
            .query_text("{ q(func: allofterms(name@en, \"Alice\")) { uid name@en friend { name@en } } }")
            .unwrap();
        assert_eq!(json["q"][0]["uid"], "0x11");
        assert_eq!(json["q"][0]["friend"][0]["name@en"], "Bob");
        let json = ns.query_text("{ q(func: uid(0x12)) { name@fr } }").unwrap();
        assert_eq!(json["q"][0]["name@fr"], "Carol");

        let uid = ns.create(&mut user("D", 30, "c4")).unwrap();
        assert_eq!(uid, Uid::new(0x13));
    }

    #[test]
    fn test_load_rejects_bad_input_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("load.schema");
        let data = dir.path().join("load.rdf");
        fs::write(&schema, "name: string .").unwrap();
        fs::write(&data, "_:a <name> \"x\" .\n_:a <name> .\n").unwrap();

        let db = Database::in_memory().unwrap();
        let ns = db.default_namespace();
        let err = ns.load(&schema, &data).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(matches!(
            ns.load(dir.path().join("missing"), &data),
            Err(Error::Io(_))
        ));
        let json = ns.query_text("{ q(func: has(name)) { uid } }").unwrap();
        assert_eq!(json["q"], Json::Array(Vec::new()));
    }

    #[test]
    fn test_upsert_with_unstored_uid_creates() {
        let db = Database::in_memory().unwrap();
        let ns = db.default_namespace();
        let mut pinned = User {
            uid: Uid::new(0x1f4),
            ..user("A", 20, "c1")
        };
        assert_eq!(ns.upsert(&mut pinned).unwrap(), (Uid::new(0x1f4), true));

        pinned.age = 21;
        assert_eq!(ns.upsert(&mut pinned).unwrap(), (Uid::new(0x1f4), false));
        let (_, stored) = ns.get::<User>(Uid::new(0x1f4)).unwrap();
        assert_eq!(stored.age, 21);

        // The caller's id is reserved, so leasing continues past it.
        assert_eq!(ns.create(&mut user("B", 30, "c2")).unwrap(), Uid::new(0x1f5));
    }

    #[test]
    fn test_raw_create_reserves_uid() {
        let db = Database::in_memory().unwrap();
        let ns = db.default_namespace();
        let mut pinned = Record::new().with_field("email", "a@b.c");
        pinned.uid = Some(Uid::new(5));
        assert_eq!(ns.raw_create(&mut pinned, [("email", "exact")]).unwrap(), Uid::new(5));

        for _ in 0..6 {
            let uid = ns.create(&mut user("B", 30, "")).unwrap();
            assert_ne!(uid, Uid::new(5));
        }
        let fetched = ns.raw_get(Uid::new(5)).unwrap();
        assert_eq!(fetched.get("email"), Some(&Value::from("a@b.c")));
    }

    #[test]
    fn test_cancelled_context() {
        let db = Database::in_memory().unwrap();
        let (ctx, cancel) = CallContext::background().with_cancel();
        cancel.cancel();
        let opts = Options::default().with_context(ctx);
        assert!(matches!(
            db.create(&mut user("A", 20, "c1"), &opts),
            Err(Error::Cancelled)
        ));
        assert!(matches!(
            db.get::<User>(Uid::new(2), &opts),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn test_alter_schema_and_drop_data() {
        let db = Database::in_memory().unwrap();
        let ns = db.create_namespace().unwrap();
        ns.alter_schema("email: string @index(exact) @unique .").unwrap();

        let mut record = Record::new().with_field("email", "a@b.c");
        let uid = ns.raw_create(&mut record, [("email", "unique")]).unwrap();
        assert_eq!(record.uid, Some(uid));

        let mut dup = Record::new().with_field("email", "a@b.c");
        let err = ns.raw_create(&mut dup, [("email", "unique")]).unwrap_err();
        assert!(err.to_string().contains("duplicate value"));
        assert!(dup.uid.is_some());

        ns.drop_data().unwrap();
        assert!(ns.raw_get(uid).unwrap_err().is_not_found());
    }

    #[test]
    fn test_raw_lookup_and_delete() {
        let db = Database::in_memory().unwrap();
        let ns = db.default_namespace();
        let mut record = Record::new()
            .with_field("email", "a@b.c")
            .with_field("age", 30i64);
        let uid = ns
            .raw_create(&mut record, [("email", "exact")])
            .unwrap();

        let fetched = ns.raw_get(ConstrainedField::new("email", "a@b.c")).unwrap();
        assert_eq!(fetched.uid, Some(uid));
        assert_eq!(fetched.get("age"), Some(&Value::Int(30)));

        assert_eq!(ns.raw_delete(uid).unwrap(), uid);
        assert!(ns.raw_get(uid).unwrap_err().is_not_found());
        assert!(ns.raw_delete(uid).unwrap_err().is_not_found());
    }
}

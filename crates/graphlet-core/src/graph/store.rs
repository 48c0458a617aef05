//! Namespaced triple store.
//!
//! The store is the data half of the bundled engine. Each namespace owns a
//! schema registry and a versioned posting storage. Writes go through two
//! steps: [`NamespaceStore::prepare`] type-checks a mutation against the
//! schema (installing schema for unseen predicates), and
//! [`NamespaceStore::apply`] makes it visible at a commit timestamp.

use std::collections::BTreeSet;
use std::sync::Arc;

use graphlet_common::types::{
    Mutation, NamespaceId, SchemaUpdate, Timestamp, Triple, Uid, Value, ValueKind,
};
use graphlet_common::utils::error::{Result, StorageError, ValidationError};
use graphlet_common::utils::hash::FxHashMap;
use parking_lot::RwLock;

use super::postings::PostingStorage;
use super::schema::SchemaRegistry;

/// Data and schema of a single namespace.
pub struct NamespaceStore {
    id: NamespaceId,
    schema: RwLock<SchemaRegistry>,
    postings: PostingStorage,
}

impl NamespaceStore {
    /// Creates an empty namespace.
    #[must_use]
    pub fn new(id: NamespaceId) -> Self {
        Self {
            id,
            schema: RwLock::new(SchemaRegistry::new()),
            postings: PostingStorage::new(),
        }
    }

    /// Returns the namespace id.
    #[must_use]
    pub fn id(&self) -> NamespaceId {
        self.id
    }

    /// Installs schema updates. All updates are validated before any is
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns an error if any update conflicts with the installed schema.
    pub fn alter_schema(&self, updates: &[SchemaUpdate]) -> Result<()> {
        let mut schema = self.schema.write();
        let mut staged = schema.clone();
        for update in updates {
            staged.apply(update)?;
        }
        *schema = staged;
        Ok(())
    }

    /// Gets a predicate definition. A language-tagged name (`name@en`)
    /// resolves to its base predicate when that is declared `@lang`.
    #[must_use]
    pub fn predicate(&self, predicate: &str) -> Option<SchemaUpdate> {
        let schema = self.schema.read();
        if let Some(found) = schema.get(predicate) {
            return Some(found.clone());
        }
        let (base, _) = split_language_tag(predicate)?;
        let mut tagged = schema.get(base).filter(|base| base.lang)?.clone();
        tagged.predicate = predicate.to_string();
        Some(tagged)
    }

    /// Returns every installed predicate definition.
    #[must_use]
    pub fn schema(&self) -> Vec<SchemaUpdate> {
        self.schema.read().all()
    }

    /// Type-checks a mutation and converts its values to the declared
    /// kinds. Predicates without a schema are installed with the kind of
    /// their first value.
    ///
    /// # Errors
    ///
    /// Returns an error for nested objects, values that cannot be converted
    /// to the declared kind, and uid predicates given scalars.
    pub fn prepare(&self, mutation: &Mutation) -> Result<Mutation> {
        let mut prepared = Mutation::new();
        for triple in &mutation.set {
            let object = self.coerce(triple)?;
            prepared.set.push(Triple {
                object,
                ..triple.clone()
            });
        }
        for triple in &mutation.del {
            if triple.is_star() || triple.object.is_null() {
                prepared.del.push(triple.clone());
                continue;
            }
            let kind = self
                .predicate(&triple.predicate)
                .map_or(ValueKind::Default, |p| p.kind);
            prepared.del.push(Triple {
                object: triple.object.convert(kind)?,
                ..triple.clone()
            });
        }
        Ok(prepared)
    }

    fn coerce(&self, triple: &Triple) -> Result<Value> {
        if matches!(triple.object, Value::Object(_) | Value::Null) {
            return Err(ValidationError::UnsupportedType(format!(
                "{} value for predicate {}",
                triple.object.type_name(),
                triple.predicate
            ))
            .into());
        }
        let declared = self.predicate(&triple.predicate);
        let declared = match declared {
            Some(declared) => declared,
            None => {
                if let Some((base, _)) = split_language_tag(&triple.predicate) {
                    return Err(ValidationError::UnsupportedType(format!(
                        "language tag on {}, predicate {base} is not declared @lang",
                        triple.predicate
                    ))
                    .into());
                }
                let kind = ValueKind::of(&triple.object)?;
                let mut update = SchemaUpdate::new(triple.predicate.clone(), kind);
                if kind == ValueKind::Uid || matches!(triple.object, Value::List(_)) {
                    update = update.with_list();
                }
                self.schema.write().apply(&update)?;
                tracing::debug!(predicate = %triple.predicate, %kind, "installed implicit schema");
                update
            }
        };
        match (&triple.object, declared.kind) {
            (Value::Uid(_), ValueKind::Uid) => Ok(triple.object.clone()),
            (Value::List(items), ValueKind::Uid)
                if items.iter().all(|v| matches!(v, Value::Uid(_))) =>
            {
                Ok(triple.object.clone())
            }
            (_, ValueKind::Uid) => Err(ValidationError::UnsupportedType(format!(
                "{} value for uid predicate {}",
                triple.object.type_name(),
                triple.predicate
            ))
            .into()),
            (object, kind) => object.convert(kind),
        }
    }

    /// Applies a prepared mutation at `commit_ts`.
    ///
    /// Deletes apply before sets. A star delete also drops every uid edge
    /// pointing at the deleted entity. List predicates accumulate distinct
    /// values; scalar predicates are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UniqueViolation`] if a `@unique` predicate
    /// would hold the same value on two entities. Nothing is written in that
    /// case.
    pub fn apply(&self, mutation: &Mutation, commit_ts: Timestamp) -> Result<()> {
        self.validate(mutation)?;

        // Pending state per (predicate, subject), seeded from the newest
        // committed version.
        let mut pending: FxHashMap<(String, Uid), Vec<Value>> = FxHashMap::default();
        let mut order: Vec<(String, Uid)> = Vec::new();
        let mut touch = |pending: &mut FxHashMap<(String, Uid), Vec<Value>>,
                         predicate: &str,
                         uid: Uid| {
            let key = (predicate.to_string(), uid);
            if !pending.contains_key(&key) {
                let current = self.postings.latest(predicate, uid).unwrap_or_default();
                pending.insert(key.clone(), current);
                order.push(key.clone());
            }
            key
        };

        for triple in &mutation.del {
            if triple.is_star() {
                for predicate in self.postings.live_predicates(triple.subject) {
                    let key = touch(&mut pending, &predicate, triple.subject);
                    pending.insert(key, Vec::new());
                }
                let target = Value::Uid(triple.subject);
                for edge in self.schema().into_iter().filter(|s| s.kind == ValueKind::Uid) {
                    for (source, values) in self.postings.scan_latest(&edge.predicate) {
                        if !values.contains(&target) {
                            continue;
                        }
                        let key = touch(&mut pending, &edge.predicate, source);
                        if let Some(values) = pending.get_mut(&key) {
                            values.retain(|v| *v != target);
                        }
                    }
                }
                continue;
            }
            let key = touch(&mut pending, &triple.predicate, triple.subject);
            let Some(values) = pending.get_mut(&key) else {
                continue;
            };
            match &triple.object {
                Value::Null => values.clear(),
                Value::List(items) => values.retain(|v| !items.contains(v)),
                object => values.retain(|v| v != object),
            }
        }

        for triple in &mutation.set {
            let list = self
                .predicate(&triple.predicate)
                .is_some_and(|p| p.list);
            let key = touch(&mut pending, &triple.predicate, triple.subject);
            let Some(values) = pending.get_mut(&key) else {
                continue;
            };
            let incoming = match &triple.object {
                Value::List(items) => items.clone(),
                object => vec![object.clone()],
            };
            if list {
                for value in incoming {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
            } else {
                *values = incoming.into_iter().last().into_iter().collect();
            }
        }

        for key in order {
            let values = pending.remove(&key).filter(|v| !v.is_empty());
            self.postings.put(&key.0, key.1, commit_ts, values);
        }
        Ok(())
    }

    /// Checks `@unique` predicates against committed data and against the
    /// rest of the mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UniqueViolation`] on the first duplicate.
    pub fn validate(&self, mutation: &Mutation) -> Result<()> {
        let mut claimed: FxHashMap<(&str, String), Uid> = FxHashMap::default();
        for triple in &mutation.set {
            let unique = self
                .predicate(&triple.predicate)
                .is_some_and(|p| p.unique);
            if !unique {
                continue;
            }
            let violation = || StorageError::UniqueViolation {
                predicate: triple.predicate.clone(),
                value: triple.object.to_string(),
            };
            let holders = self.postings.scan_latest(&triple.predicate);
            let deleted: BTreeSet<Uid> = mutation
                .del
                .iter()
                .filter(|d| d.is_star() || d.predicate == triple.predicate)
                .map(|d| d.subject)
                .collect();
            if holders.iter().any(|(uid, values)| {
                *uid != triple.subject && !deleted.contains(uid) && values.contains(&triple.object)
            }) {
                return Err(violation().into());
            }
            let key = (triple.predicate.as_str(), triple.object.to_string());
            match claimed.get(&key) {
                Some(uid) if *uid != triple.subject => return Err(violation().into()),
                _ => {
                    claimed.insert(key, triple.subject);
                }
            }
        }
        Ok(())
    }

    /// Gets the values of `predicate` on `uid` visible at `ts`.
    #[must_use]
    pub fn values(&self, predicate: &str, uid: Uid, ts: Timestamp) -> Option<Vec<Value>> {
        self.postings.get(predicate, uid, ts)
    }

    /// Returns every `(entity, values)` pair of a predicate at `ts`.
    #[must_use]
    pub fn scan(&self, predicate: &str, ts: Timestamp) -> Vec<(Uid, Vec<Value>)> {
        self.postings.scan(predicate, ts)
    }

    /// Returns every predicate of an entity at `ts`, sorted by name.
    #[must_use]
    pub fn predicates_of(&self, uid: Uid, ts: Timestamp) -> Vec<(String, Vec<Value>)> {
        self.postings.predicates_of(uid, ts)
    }

    /// Returns true if the entity has any predicate at `ts`.
    #[must_use]
    pub fn exists(&self, uid: Uid, ts: Timestamp) -> bool {
        self.postings.exists(uid, ts)
    }

    /// Returns every entity with any predicate at `ts`.
    #[must_use]
    pub fn subjects(&self, ts: Timestamp) -> BTreeSet<Uid> {
        self.postings.subjects(ts)
    }

    /// Returns the entities that point at `target` through `predicate`.
    #[must_use]
    pub fn reverse(&self, predicate: &str, target: Uid, ts: Timestamp) -> Vec<Uid> {
        let needle = Value::Uid(target);
        self.postings
            .scan(predicate, ts)
            .into_iter()
            .filter(|(_, values)| values.contains(&needle))
            .map(|(uid, _)| uid)
            .collect()
    }
}

/// Splits `name@en` into its base predicate and language tag.
#[must_use]
pub fn split_language_tag(predicate: &str) -> Option<(&str, &str)> {
    predicate
        .rsplit_once('@')
        .filter(|(base, tag)| !base.is_empty() && !tag.is_empty())
}

/// All namespaces of the bundled engine.
pub struct TripleStore {
    namespaces: RwLock<FxHashMap<NamespaceId, Arc<NamespaceStore>>>,
}

impl TripleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(FxHashMap::default()),
        }
    }

    /// Gets a namespace, creating it on first use.
    pub fn namespace(&self, id: NamespaceId) -> Arc<NamespaceStore> {
        if let Some(ns) = self.namespaces.read().get(&id) {
            return Arc::clone(ns);
        }
        let mut namespaces = self.namespaces.write();
        Arc::clone(
            namespaces
                .entry(id)
                .or_insert_with(|| Arc::new(NamespaceStore::new(id))),
        )
    }

    /// Gets a namespace if it has been used.
    #[must_use]
    pub fn get(&self, id: NamespaceId) -> Option<Arc<NamespaceStore>> {
        self.namespaces.read().get(&id).cloned()
    }

    /// Drops a namespace's data and schema.
    pub fn drop_namespace(&self, id: NamespaceId) {
        self.namespaces.write().remove(&id);
    }

    /// Drops every namespace.
    pub fn drop_all(&self) {
        self.namespaces.write().clear();
    }

    /// Returns the number of namespaces in use.
    #[must_use]
    pub fn namespace_count(&self) -> usize {
        self.namespaces.read().len()
    }
}

impl Default for TripleStore {
    fn default() -> Self {
        Self::new()
    }
}

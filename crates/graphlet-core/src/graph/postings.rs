//! Versioned posting storage.
//!
//! Postings are stored column-wise: each predicate has its own column mapping
//! an entity to a chain of committed versions. A read at timestamp `ts` sees
//! the newest version committed at or before `ts`, so readers never observe
//! a write that committed after their snapshot.

use std::collections::{BTreeMap, BTreeSet};

use graphlet_common::types::{Timestamp, Uid, Value};
use graphlet_common::utils::hash::FxHashMap;
use parking_lot::RwLock;

/// One committed state of a `(predicate, entity)` pair.
#[derive(Debug, Clone, PartialEq)]
struct Version {
    ts: Timestamp,
    /// `None` marks a deletion.
    values: Option<Vec<Value>>,
}

/// Columnar, multi-version posting storage for one namespace.
pub struct PostingStorage {
    /// Map from predicate name to column.
    columns: RwLock<FxHashMap<String, PostingColumn>>,
}

impl PostingStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: RwLock::new(FxHashMap::default()),
        }
    }

    /// Records a new version for an entity. `None` deletes.
    pub fn put(&self, predicate: &str, uid: Uid, ts: Timestamp, values: Option<Vec<Value>>) {
        let mut columns = self.columns.write();
        columns
            .entry(predicate.to_string())
            .or_insert_with(PostingColumn::new)
            .put(uid, ts, values);
    }

    /// Gets the values visible at `ts`.
    #[must_use]
    pub fn get(&self, predicate: &str, uid: Uid, ts: Timestamp) -> Option<Vec<Value>> {
        let columns = self.columns.read();
        columns.get(predicate).and_then(|col| col.get(uid, ts))
    }

    /// Gets the newest committed values regardless of timestamp.
    #[must_use]
    pub fn latest(&self, predicate: &str, uid: Uid) -> Option<Vec<Value>> {
        let columns = self.columns.read();
        columns.get(predicate).and_then(|col| col.latest(uid))
    }

    /// Returns every entity with a visible value for `predicate`, in
    /// ascending id order.
    #[must_use]
    pub fn scan(&self, predicate: &str, ts: Timestamp) -> Vec<(Uid, Vec<Value>)> {
        let columns = self.columns.read();
        columns
            .get(predicate)
            .map(|col| col.scan(ts))
            .unwrap_or_default()
    }

    /// Returns the newest values of every entity for `predicate`.
    #[must_use]
    pub fn scan_latest(&self, predicate: &str) -> Vec<(Uid, Vec<Value>)> {
        let columns = self.columns.read();
        columns
            .get(predicate)
            .map(PostingColumn::scan_latest)
            .unwrap_or_default()
    }

    /// Gets all predicates visible for an entity at `ts`, sorted by name.
    #[must_use]
    pub fn predicates_of(&self, uid: Uid, ts: Timestamp) -> Vec<(String, Vec<Value>)> {
        let columns = self.columns.read();
        let mut result: Vec<(String, Vec<Value>)> = columns
            .iter()
            .filter_map(|(key, col)| col.get(uid, ts).map(|values| (key.clone(), values)))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    /// Returns the names of predicates with a live newest version for an
    /// entity.
    #[must_use]
    pub fn live_predicates(&self, uid: Uid) -> Vec<String> {
        let columns = self.columns.read();
        columns
            .iter()
            .filter(|(_, col)| col.latest(uid).is_some())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns true if the entity has any visible value at `ts`.
    #[must_use]
    pub fn exists(&self, uid: Uid, ts: Timestamp) -> bool {
        let columns = self.columns.read();
        columns.values().any(|col| col.get(uid, ts).is_some())
    }

    /// Returns every entity with any visible value at `ts`.
    #[must_use]
    pub fn subjects(&self, ts: Timestamp) -> BTreeSet<Uid> {
        let columns = self.columns.read();
        let mut result = BTreeSet::new();
        for col in columns.values() {
            result.extend(col.scan(ts).into_iter().map(|(uid, _)| uid));
        }
        result
    }

    /// Returns the number of predicate columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.read().len()
    }

    /// Removes everything.
    pub fn clear(&self) {
        self.columns.write().clear();
    }
}

impl Default for PostingStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// A single predicate column.
pub struct PostingColumn {
    /// Version chains in commit order, keyed by entity.
    entries: BTreeMap<Uid, Vec<Version>>,
}

impl PostingColumn {
    /// Creates a new empty column.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Appends a version.
    pub fn put(&mut self, uid: Uid, ts: Timestamp, values: Option<Vec<Value>>) {
        let values = values.filter(|v| !v.is_empty());
        let chain = self.entries.entry(uid).or_default();
        match chain.last_mut() {
            // Same transaction touching the pair twice keeps one version.
            Some(last) if last.ts == ts => last.values = values,
            _ => chain.push(Version { ts, values }),
        }
    }

    /// Gets the values visible at `ts`.
    #[must_use]
    pub fn get(&self, uid: Uid, ts: Timestamp) -> Option<Vec<Value>> {
        self.entries
            .get(&uid)?
            .iter()
            .rev()
            .find(|v| v.ts <= ts)?
            .values
            .clone()
    }

    /// Gets the newest values.
    #[must_use]
    pub fn latest(&self, uid: Uid) -> Option<Vec<Value>> {
        self.entries.get(&uid)?.last()?.values.clone()
    }

    /// Returns every entity with a visible value at `ts`.
    #[must_use]
    pub fn scan(&self, ts: Timestamp) -> Vec<(Uid, Vec<Value>)> {
        self.entries
            .keys()
            .filter_map(|&uid| self.get(uid, ts).map(|values| (uid, values)))
            .collect()
    }

    /// Returns every entity's newest values.
    #[must_use]
    pub fn scan_latest(&self) -> Vec<(Uid, Vec<Value>)> {
        self.entries
            .keys()
            .filter_map(|&uid| self.latest(uid).map(|values| (uid, values)))
            .collect()
    }

    /// Returns the number of entities with any version.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if this column has no versions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PostingColumn {
    fn default() -> Self {
        Self::new()
    }
}

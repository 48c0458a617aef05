//! Per-namespace schema registry.

use graphlet_common::types::{SchemaUpdate, TYPE_PREDICATE, Tokenizer, ValueKind};
use graphlet_common::utils::error::{Result, StorageError};
use graphlet_common::utils::hash::FxHashMap;

/// Installed predicate definitions of one namespace.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    predicates: FxHashMap<String, SchemaUpdate>,
}

impl SchemaRegistry {
    /// Creates a registry holding only the built-in type predicate.
    #[must_use]
    pub fn new() -> Self {
        let mut predicates = FxHashMap::default();
        predicates.insert(
            TYPE_PREDICATE.to_string(),
            SchemaUpdate::new(TYPE_PREDICATE, ValueKind::String)
                .with_list()
                .with_tokenizer(Tokenizer::Exact),
        );
        Self { predicates }
    }

    /// Installs or extends a predicate definition.
    ///
    /// Re-declaring a predicate with the same kind merges index directives;
    /// an untyped (`default`) predicate may be given a concrete kind once.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SchemaConflict`] when the kind changes or
    /// when a vector index is placed on a non-vector predicate.
    pub fn apply(&mut self, update: &SchemaUpdate) -> Result<()> {
        if update.vector_index.is_some() && update.kind != ValueKind::Vector {
            return Err(StorageError::SchemaConflict(format!(
                "vector index on {} predicate {}",
                update.kind, update.predicate
            ))
            .into());
        }
        match self.predicates.get_mut(&update.predicate) {
            Some(existing) if existing.kind == update.kind => {
                for tokenizer in &update.tokenizers {
                    if !existing.tokenizers.contains(tokenizer) {
                        existing.tokenizers.push(*tokenizer);
                    }
                }
                existing.list |= update.list;
                existing.reverse |= update.reverse;
                existing.upsert |= update.upsert;
                existing.unique |= update.unique;
                existing.lang |= update.lang;
                if update.vector_index.is_some() {
                    existing.vector_index = update.vector_index;
                }
            }
            Some(existing) if existing.kind == ValueKind::Default => {
                *existing = update.clone();
            }
            Some(existing) => {
                return Err(StorageError::SchemaConflict(format!(
                    "predicate {} is {}, cannot change to {}",
                    update.predicate, existing.kind, update.kind
                ))
                .into());
            }
            None => {
                self.predicates
                    .insert(update.predicate.clone(), update.clone());
            }
        }
        Ok(())
    }

    /// Gets a predicate definition.
    #[must_use]
    pub fn get(&self, predicate: &str) -> Option<&SchemaUpdate> {
        self.predicates.get(predicate)
    }

    /// Returns true if the predicate is installed.
    #[must_use]
    pub fn contains(&self, predicate: &str) -> bool {
        self.predicates.contains_key(predicate)
    }

    /// Returns all definitions sorted by predicate name.
    #[must_use]
    pub fn all(&self) -> Vec<SchemaUpdate> {
        let mut all: Vec<SchemaUpdate> = self.predicates.values().cloned().collect();
        all.sort_by(|a, b| a.predicate.cmp(&b.predicate));
        all
    }

    /// Returns the names of predicates declared with `@reverse`.
    #[must_use]
    pub fn reverse_predicates(&self) -> Vec<String> {
        self.predicates
            .values()
            .filter(|p| p.reverse)
            .map(|p| p.predicate.clone())
            .collect()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

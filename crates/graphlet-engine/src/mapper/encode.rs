//! Encode path: records to mutations.

use indexmap::IndexMap;

use graphlet_common::types::{Mutation, Record, SchemaUpdate, TYPE_PREDICATE, Triple, Uid, Value};
use graphlet_common::utils::error::{Result, ValidationError};
use graphlet_common::utils::hash::FxHashMap;

use super::LinkLookup;
use crate::lease::LeaseManager;
use crate::schema::{ResolvedType, SchemaResolver};

/// Which entity a write goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A new entity; the record's own id is used, and reserved, if it has
    /// one, otherwise a fresh id is leased.
    New,
    /// An existing entity. List predicates are replaced, not extended.
    Existing(Uid),
}

/// The result of encoding one record.
#[derive(Debug, Clone)]
pub struct Encoded {
    /// Id of the root entity.
    pub uid: Uid,
    /// Triples to write.
    pub mutation: Mutation,
    /// Directives for every predicate touched, first declaration wins.
    pub schema: Vec<SchemaUpdate>,
    /// The input with every assigned id stamped in.
    pub record: Record,
}

/// Turns records into mutations.
pub struct ObjectMapper<'a> {
    resolver: &'a SchemaResolver,
    leases: &'a LeaseManager,
    lookup: &'a dyn LinkLookup,
}

#[derive(Default)]
struct EncodeState {
    mutation: Mutation,
    schema: IndexMap<String, SchemaUpdate>,
    // (predicate, value) -> id, for link keys of entities created in this
    // encode.
    pending: FxHashMap<(String, String), Uid>,
}

impl EncodeState {
    fn declare(&mut self, update: &SchemaUpdate) {
        if !self.schema.contains_key(&update.predicate) {
            self.schema.insert(update.predicate.clone(), update.clone());
        }
    }
}

impl<'a> ObjectMapper<'a> {
    /// Creates a mapper leasing ids from `leases` and resolving nested
    /// links through `lookup`.
    #[must_use]
    pub fn new(
        resolver: &'a SchemaResolver,
        leases: &'a LeaseManager,
        lookup: &'a dyn LinkLookup,
    ) -> Self {
        Self {
            resolver,
            leases,
            lookup,
        }
    }

    /// Encodes `record` as the entity `target`.
    ///
    /// Nested objects that already carry an id are linked. Otherwise the
    /// first non-empty link-key field is looked up, and a match is linked
    /// instead of creating a duplicate. Remaining nested objects are
    /// created.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoUniqueConstraint`] for a typed record
    /// whose type declares no indexed field, validation errors for values
    /// that do not fit their field, and lease or lookup failures.
    pub fn encode(
        &self,
        mut record: Record,
        resolved: &ResolvedType,
        target: Target,
    ) -> Result<Encoded> {
        if let Some(type_name) = &resolved.type_name {
            if !resolved.has_constraint() {
                return Err(ValidationError::NoUniqueConstraint(type_name.clone()).into());
            }
        }
        let mut state = EncodeState::default();
        let uid = self.encode_record(&mut state, &mut record, resolved, target)?;
        tracing::debug!(
            %uid,
            set = state.mutation.set.len(),
            del = state.mutation.del.len(),
            predicates = state.schema.len(),
            "encoded record"
        );
        Ok(Encoded {
            uid,
            mutation: state.mutation,
            schema: state.schema.into_values().collect(),
            record,
        })
    }

    fn encode_record(
        &self,
        state: &mut EncodeState,
        record: &mut Record,
        resolved: &ResolvedType,
        target: Target,
    ) -> Result<Uid> {
        let (uid, existing) = match target {
            Target::Existing(uid) => (uid, true),
            Target::New => match record.assigned_uid() {
                Some(uid) => {
                    self.leases.reserve_uid(uid)?;
                    (uid, false)
                }
                None => (self.leases.next_uid()?, false),
            },
        };
        record.uid = Some(uid);

        if let Some(type_name) = &resolved.type_name {
            state
                .mutation
                .set
                .push(Triple::new(uid, TYPE_PREDICATE, type_name.as_str()));
        }

        for field in &resolved.fields {
            state.declare(&field.schema);
            let Some(value) = record.fields.get_mut(&field.predicate) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }

            let object = match field.nested {
                Some(desc) => {
                    let nested = self.resolver.resolve(desc)?;
                    Value::Uid(self.link(state, value, &nested)?)
                }
                None => {
                    if matches!(value, Value::Object(_)) {
                        return Err(ValidationError::UnsupportedType(format!(
                            "object value for scalar field {}",
                            field.predicate
                        ))
                        .into());
                    }
                    if field.is_link_key() {
                        state
                            .pending
                            .insert((field.predicate.clone(), value.to_string()), uid);
                    }
                    value.clone()
                }
            };

            if existing && field.list {
                state
                    .mutation
                    .del
                    .push(Triple::new(uid, field.predicate.clone(), Value::Null));
            }
            state
                .mutation
                .set
                .push(Triple::new(uid, field.predicate.clone(), object));
        }
        Ok(uid)
    }

    /// Resolves a nested value to the id of the entity it links to,
    /// creating the entity if no existing one matches.
    fn link(
        &self,
        state: &mut EncodeState,
        value: &mut Value,
        nested: &ResolvedType,
    ) -> Result<Uid> {
        let record = match value {
            Value::Uid(uid) => return Ok(*uid),
            Value::Object(record) => record,
            other => {
                return Err(ValidationError::UnsupportedType(format!(
                    "{} value for nested {} field",
                    other.type_name(),
                    nested.display_name()
                ))
                .into());
            }
        };
        if let Some(uid) = record.assigned_uid() {
            self.leases.reserve_uid(uid)?;
            return Ok(uid);
        }

        for key in nested.link_keys() {
            let Some(value) = record.get(&key.predicate).filter(|v| !v.is_empty()) else {
                continue;
            };
            let pending = state
                .pending
                .get(&(key.predicate.clone(), value.to_string()))
                .copied();
            let found = match pending {
                Some(uid) => Some(uid),
                None => self.lookup.find(&key.predicate, value)?,
            };
            if let Some(uid) = found {
                tracing::debug!(%uid, predicate = %key.predicate, "linked existing entity");
                record.uid = Some(uid);
                return Ok(uid);
            }
        }

        self.encode_record(state, record, nested, Target::New)
    }
}

//! Schema resolution: from type descriptors to predicates and constraints.
//!
//! A [`ResolvedType`] lists, for every stored field, its predicate name,
//! scalar kind, index marker and schema directive, plus the reverse edges
//! the type reads. Declared types are resolved once and cached; raw records
//! are resolved per call from their values and a constraint map.

use std::sync::Arc;

use parking_lot::RwLock;

use graphlet_common::types::{
    IndexKind, Record, SchemaUpdate, Tokenizer, Value, ValueKind, VectorMetric,
};
use graphlet_common::utils::error::{Result, ValidationError};
use graphlet_common::utils::hash::FxHashMap;

use crate::object::{FieldRole, FieldShape, TypeDescriptor};

/// One stored field of a resolved type.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    /// Field name as declared, or the predicate for raw records.
    pub name: String,
    /// Predicate name.
    pub predicate: String,
    /// Scalar kind; [`ValueKind::Uid`] for nested objects.
    pub kind: ValueKind,
    /// Whether the field holds a list.
    pub list: bool,
    /// Index marker, if any.
    pub index: Option<IndexKind>,
    /// Descriptor of the nested type, for edge fields.
    pub nested: Option<&'static TypeDescriptor>,
    /// Directive installed before data is written.
    pub schema: SchemaUpdate,
}

impl ResolvedField {
    /// Returns true if the field can identify an existing entity.
    #[must_use]
    pub fn is_link_key(&self) -> bool {
        self.nested.is_none() && self.index.is_some_and(|i| i.is_link_key())
    }
}

/// A reverse edge read into a declared field.
#[derive(Debug, Clone)]
pub struct ReverseEdge {
    /// Record key the results are stored under, `"<Type>.<field>"`.
    pub key: String,
    /// Forward predicate pointing at this type.
    pub predicate: String,
    /// Descriptor of the pointing type.
    pub target: &'static TypeDescriptor,
}

/// Predicates, constraints and reverse edges of one type.
#[derive(Debug, Clone, Default)]
pub struct ResolvedType {
    /// Type name; `None` for raw records.
    pub type_name: Option<String>,
    /// Stored fields in declaration order.
    pub fields: Vec<ResolvedField>,
    /// Reverse edges.
    pub reverse: Vec<ReverseEdge>,
}

impl ResolvedType {
    /// Looks up a field by predicate name.
    #[must_use]
    pub fn field(&self, predicate: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.predicate == predicate)
    }

    /// Looks up a field by declared name.
    #[must_use]
    pub fn field_named(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the fields usable as link keys, in declaration order.
    pub fn link_keys(&self) -> impl Iterator<Item = &ResolvedField> {
        self.fields.iter().filter(|f| f.is_link_key())
    }

    /// Returns true if any field carries an index marker.
    #[must_use]
    pub fn has_constraint(&self) -> bool {
        self.fields.iter().any(|f| f.index.is_some())
    }

    /// Returns the schema directives of every field.
    #[must_use]
    pub fn schema_updates(&self) -> Vec<SchemaUpdate> {
        self.fields.iter().map(|f| f.schema.clone()).collect()
    }

    /// Returns the display name used in error messages.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or("raw record")
    }
}

/// Resolves and caches type descriptors.
#[derive(Default)]
pub struct SchemaResolver {
    cache: RwLock<FxHashMap<&'static str, Arc<ResolvedType>>>,
}

impl SchemaResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a declared type.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoUniqueConstraint`] naming a nested type
    /// without an indexed field, [`ValidationError::VectorIndexOnNonVector`]
    /// for a misplaced vector index, and [`ValidationError::UnsupportedType`]
    /// for other misplaced indexes.
    pub fn resolve(&self, desc: &'static TypeDescriptor) -> Result<Arc<ResolvedType>> {
        if let Some(resolved) = self.cache.read().get(desc.name) {
            return Ok(Arc::clone(resolved));
        }
        let resolved = Arc::new(resolve_descriptor(desc)?);
        tracing::debug!(
            type_name = desc.name,
            fields = resolved.fields.len(),
            reverse = resolved.reverse.len(),
            "resolved type"
        );
        self.cache
            .write()
            .insert(desc.name, Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Returns the number of cached types.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

fn resolve_descriptor(desc: &'static TypeDescriptor) -> Result<ResolvedType> {
    let mut resolved = ResolvedType {
        type_name: Some(desc.name.to_string()),
        ..ResolvedType::default()
    };
    for field in &desc.fields {
        match field.role {
            FieldRole::Uid => {}
            FieldRole::Reverse {
                type_name,
                field: forward,
                target,
            } => resolved.reverse.push(ReverseEdge {
                key: field.predicate.to_string(),
                predicate: format!("{type_name}.{forward}"),
                target: target(),
            }),
            FieldRole::Value(FieldShape::Object(nested)) => {
                let nested = nested();
                if !nested.has_constraint() {
                    return Err(ValidationError::NoUniqueConstraint(nested.name.to_string()).into());
                }
                if field.index.is_some() {
                    return Err(ValidationError::UnsupportedType(format!(
                        "index on nested object field {}",
                        field.predicate
                    ))
                    .into());
                }
                resolved.fields.push(ResolvedField {
                    name: field.name.to_string(),
                    predicate: field.predicate.to_string(),
                    kind: ValueKind::Uid,
                    list: false,
                    index: None,
                    nested: Some(nested),
                    schema: SchemaUpdate::new(field.predicate, ValueKind::Uid).with_reverse(),
                });
            }
            FieldRole::Value(FieldShape::Scalar { kind, list }) => {
                resolved.fields.push(scalar_field(
                    field.name.to_string(),
                    field.predicate.to_string(),
                    kind,
                    list,
                    field.index,
                )?);
            }
        }
    }
    Ok(resolved)
}

fn scalar_field(
    name: String,
    predicate: String,
    kind: ValueKind,
    list: bool,
    index: Option<IndexKind>,
) -> Result<ResolvedField> {
    let mut schema = SchemaUpdate::new(predicate.clone(), kind);
    if list {
        schema = schema.with_list();
    }
    if let Some(index) = index {
        schema = apply_index(schema, index)?;
    }
    Ok(ResolvedField {
        name,
        predicate,
        kind,
        list,
        index,
        nested: None,
        schema,
    })
}

fn apply_index(schema: SchemaUpdate, index: IndexKind) -> Result<SchemaUpdate> {
    let kind = schema.kind;
    let text_only = |tokenizer: Tokenizer| {
        if kind == ValueKind::String {
            Ok(schema.clone().with_tokenizer(tokenizer))
        } else {
            Err(ValidationError::UnsupportedType(format!(
                "{} index on {kind} field {}",
                tokenizer.name(),
                schema.predicate
            )))
        }
    };
    Ok(match index {
        IndexKind::Exact => schema.clone().with_tokenizer(Tokenizer::default_for(kind)),
        IndexKind::Hash => text_only(Tokenizer::Hash)?,
        IndexKind::Term => text_only(Tokenizer::Term)?,
        IndexKind::Fulltext => text_only(Tokenizer::Fulltext)?,
        IndexKind::Trigram => text_only(Tokenizer::Trigram)?,
        IndexKind::Unique => schema
            .clone()
            .with_unique()
            .with_tokenizer(Tokenizer::default_for(kind)),
        IndexKind::Vector => {
            if kind != ValueKind::Vector {
                return Err(ValidationError::VectorIndexOnNonVector(schema.predicate).into());
            }
            schema.with_vector_index(VectorMetric::Cosine)
        }
    })
}

/// Resolves a raw record against a constraint map of predicate to index
/// marker (`"unique"`, `"exact"`, `"vector"`, ...).
///
/// Kinds are inferred from the values; null and empty values are skipped.
///
/// # Errors
///
/// Returns [`ValidationError::UnsupportedType`] for nested objects, values
/// without a stored kind and unknown markers, and the index errors of
/// [`SchemaResolver::resolve`].
pub fn resolve_raw(record: &Record, constraints: &FxHashMap<String, String>) -> Result<ResolvedType> {
    let mut resolved = ResolvedType::default();
    for (predicate, value) in &record.fields {
        if value.is_empty() {
            continue;
        }
        if matches!(value, Value::Object(_)) {
            return Err(ValidationError::UnsupportedType(format!(
                "nested object in raw field {predicate}"
            ))
            .into());
        }
        let kind = ValueKind::of(value)?;
        let list = matches!(value, Value::List(_)) || kind == ValueKind::Uid;
        let index = constraints
            .get(predicate)
            .map(|marker| {
                IndexKind::from_marker(marker).ok_or_else(|| {
                    ValidationError::UnsupportedType(format!(
                        "constraint {marker} on field {predicate}"
                    ))
                })
            })
            .transpose()?;
        resolved.fields.push(scalar_field(
            predicate.clone(),
            predicate.clone(),
            kind,
            list,
            index,
        )?);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_object;
    use crate::object::Object;
    use graphlet_common::types::Uid;

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

    graph_object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Owner {
            #[uid]
            uid: Uid,
            #[index(unique)]
            email: String,
            user: Option<User>,
            #[reverse(Pet, owner)]
            pets: Vec<Pet>,
        }
    }

    graph_object! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Pet {
            #[uid]
            uid: Uid,
            #[index(term)]
            name: String,
            owner: Option<Owner>,
        }
    }

    graph_object! {
        #[derive(Debug, Clone, Default)]
        struct Loose {
            name: String,
        }
    }

    graph_object! {
        #[derive(Debug, Clone, Default)]
        struct Holder {
            #[index(exact)]
            name: String,
            loose: Option<Loose>,
        }
    }

    graph_object! {
        #[derive(Debug, Clone, Default)]
        struct BadVector {
            #[index(vector)]
            name: String,
        }
    }

    #[test]
    fn test_resolve_scalars() {
        let resolver = SchemaResolver::new();
        let user = resolver.resolve(User::descriptor()).unwrap();
        assert_eq!(user.type_name.as_deref(), Some("User"));
        assert_eq!(user.fields.len(), 3);

        let clerk = user.field("User.clerk_id").unwrap();
        assert!(clerk.is_link_key());
        assert!(clerk.schema.has_tokenizer(Tokenizer::Exact));
        assert!(!clerk.schema.unique);
        assert!(!user.field_named("age").unwrap().schema.is_indexed());
        assert_eq!(user.link_keys().count(), 1);

        resolver.resolve(User::descriptor()).unwrap();
        assert_eq!(resolver.cached(), 1);
    }

    #[test]
    fn test_resolve_nested_and_reverse() {
        let resolver = SchemaResolver::new();
        let owner = resolver.resolve(Owner::descriptor()).unwrap();

        let email = owner.field("Owner.email").unwrap();
        assert!(email.schema.unique && email.schema.upsert);
        assert!(email.schema.has_tokenizer(Tokenizer::Exact));

        let user = owner.field("Owner.user").unwrap();
        assert_eq!(user.kind, ValueKind::Uid);
        assert!(user.schema.reverse && !user.schema.list);
        assert_eq!(user.nested.map(|d| d.name), Some("User"));
        assert!(!user.is_link_key());

        assert_eq!(owner.reverse.len(), 1);
        assert_eq!(owner.reverse[0].key, "Owner.pets");
        assert_eq!(owner.reverse[0].predicate, "Pet.owner");
        assert_eq!(owner.reverse[0].target.name, "Pet");

        let pet = resolver.resolve(Pet::descriptor()).unwrap();
        assert!(pet.field("Pet.name").unwrap().schema.has_tokenizer(Tokenizer::Term));
        assert_eq!(pet.link_keys().count(), 0);
        assert!(pet.has_constraint());
    }

    #[test]
    fn test_nested_type_needs_constraint() {
        let err = SchemaResolver::new()
            .resolve(Holder::descriptor())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unique constraint not defined for any field on type Loose"
        );
    }

    #[test]
    fn test_vector_index_needs_vector_field() {
        let err = SchemaResolver::new()
            .resolve(BadVector::descriptor())
            .unwrap_err();
        assert!(matches!(
            err,
            graphlet_common::Error::Validation(ValidationError::VectorIndexOnNonVector(_))
        ));
    }

    #[test]
    fn test_resolve_raw() {
        let record = Record::new()
            .with_field("email", "a@b.c")
            .with_field("age", 7i64)
            .with_field("note", "");
        let mut constraints = FxHashMap::default();
        constraints.insert("email".to_string(), "unique".to_string());

        let resolved = resolve_raw(&record, &constraints).unwrap();
        assert_eq!(resolved.type_name, None);
        assert_eq!(resolved.fields.len(), 2);
        assert!(resolved.field("email").unwrap().schema.unique);
        assert_eq!(resolved.field("age").unwrap().kind, ValueKind::Int);

        constraints.insert("age".to_string(), "sideways".to_string());
        assert!(resolve_raw(&record, &constraints).is_err());
    }
}

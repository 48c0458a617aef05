//! Core type definitions for Graphlet.
//!
//! This module contains all fundamental types used throughout the database:
//! - Identifier types ([`Uid`], [`Timestamp`], [`NamespaceId`])
//! - Value types ([`Value`], [`ValueKind`], [`Point`], [`Record`])
//! - Write types ([`Mutation`], [`Triple`], [`SchemaUpdate`])

mod id;
mod mutation;
mod record;
mod value;

pub use id::{NamespaceId, Timestamp, Uid};
pub use mutation::{IndexKind, Mutation, SchemaUpdate, Tokenizer, Triple, VectorMetric, STAR};
pub use record::Record;
pub use value::{Point, Value, ValueKind};

/// Predicate that records an entity's type membership.
pub const TYPE_PREDICATE: &str = "dgraph.type";

/// Builds the namespaced predicate name `"<Type>.<field>"`.
#[must_use]
pub fn predicate_name(type_name: &str, field: &str) -> String {
    format!("{type_name}.{field}")
}

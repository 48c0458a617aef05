//! # graphlet-engine
//!
//! The typed object layer of Graphlet: id and timestamp leasing, type
//! descriptors, the object-graph mappers, query construction and the
//! database handle.
//!
//! ## Modules
//!
//! - [`lease`] - Batched, persisted allocation of ids, timestamps and namespace ids
//! - [`object`] - Type descriptors, field conversions and the [`graph_object!`] macro
//! - [`schema`] - Resolution of descriptors into predicates and index directives
//! - [`mapper`] - Encoding records into mutations and decoding query results
//! - [`query_builder`] - Filter, pagination and sorting rendering
//! - [`database`] / [`namespace`] - The handle and its namespace-scoped operations
//! - [`config`] / [`options`] - Database configuration and per-call options

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod database;
pub mod lease;
pub mod mapper;
pub mod namespace;
pub mod object;
pub mod options;
pub mod query_builder;
pub mod schema;

pub use config::Config;
pub use database::Database;
pub use lease::{LeaseManager, LeaseState, UidRange};
pub use namespace::Namespace;
pub use object::{Decodable, Encodable, Object};
pub use options::Options;
pub use query_builder::{
    ConstrainedField, Filter, Lookup, Pagination, QueryParams, Sorting, StringPredicate,
    VectorPredicate,
};

pub use graphlet_common::types::{IndexKind, NamespaceId, Point, Record, Uid, Value};
pub use graphlet_common::utils::context::{CallContext, CancelHandle};
pub use graphlet_common::utils::error::{Error, Result, ValidationError};

//! # Graphlet
//!
//! An embedded property-graph database with a typed object API.
//!
//! Declare types with [`graph_object!`], open a [`Database`], and create,
//! fetch, upsert, delete and query objects. Nested objects become edges;
//! a nested object matching an existing entity on an indexed field is
//! linked rather than duplicated.
//!
//! ## Quick Start
//!
//! ```rust
//! use graphlet::{graph_object, ConstrainedField, Database, Filter, Options, QueryParams, Uid};
//!
//! graph_object! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Project {
//!         #[uid]
//!         pub uid: Uid,
//!         #[index(exact)]
//!         pub name: String,
//!     }
//! }
//!
//! graph_object! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Branch {
//!         #[uid]
//!         pub uid: Uid,
//!         #[index(exact)]
//!         pub name: String,
//!         pub proj: Option<Project>,
//!     }
//! }
//!
//! let db = Database::in_memory()?;
//! let opts = Options::default();
//!
//! let mut main = Branch {
//!     name: "main".into(),
//!     proj: Some(Project { name: "graphlet".into(), ..Project::default() }),
//!     ..Branch::default()
//! };
//! db.create(&mut main, &opts)?;
//!
//! // Same project name: linked to the existing entity.
//! let mut dev = Branch {
//!     name: "dev".into(),
//!     proj: Some(Project { name: "graphlet".into(), ..Project::default() }),
//!     ..Branch::default()
//! };
//! db.create(&mut dev, &opts)?;
//! assert_eq!(main.proj.as_ref().map(|p| p.uid), dev.proj.as_ref().map(|p| p.uid));
//!
//! let (_, found) = db.get::<Branch>(ConstrainedField::new("name", "dev"), &opts)?;
//! assert_eq!(found.proj.map(|p| p.name), Some("graphlet".to_string()));
//!
//! let branches = db.query::<Branch>(
//!     &QueryParams::new().with_filter(Filter::eq("name", "main")),
//!     &opts,
//! )?;
//! assert_eq!(branches.len(), 1);
//! # Ok::<(), graphlet::Error>(())
//! ```

pub use graphlet_engine::{
    CallContext, CancelHandle, Config, ConstrainedField, Database, Decodable, Encodable, Error,
    Filter, IndexKind, LeaseManager, LeaseState, Lookup, Namespace, NamespaceId, Object, Options,
    Pagination, Point, QueryParams, Record, Result, Sorting, StringPredicate, Uid, UidRange,
    ValidationError, Value, VectorPredicate, graph_object,
};

pub use graphlet_adapters::LocalEngine;
pub use graphlet_core::Engine;

/// Lower-level building blocks: descriptors, mappers and query text.
pub mod mapping {
    pub use graphlet_engine::mapper::{Encoded, LinkLookup, ObjectMapper, ResultMapper, Target};
    pub use graphlet_engine::object::{FieldDescriptor, FieldRole, FieldShape, TypeDescriptor};
    pub use graphlet_engine::query_builder::{filter_clause, objects_query};
    pub use graphlet_engine::schema::{ResolvedField, ResolvedType, SchemaResolver};
}

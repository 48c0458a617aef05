//! Graph storage: versioned postings, schema, and the namespaced store.

pub mod postings;
pub mod schema;
pub mod store;

pub use postings::{PostingColumn, PostingStorage};
pub use schema::SchemaRegistry;
pub use store::{NamespaceStore, TripleStore};

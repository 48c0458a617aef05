//! # graphlet-core
//!
//! Core layer for Graphlet: the storage primitives of the bundled engine.
//!
//! This crate provides the data structures the engine stores and reads graph
//! data with, plus the [`Engine`] contract the mapping layer programs
//! against. It depends only on `graphlet-common`.
//!
//! ## Modules
//!
//! - [`graph`] - Namespaced, versioned triple store and schema registry
//! - [`index`] - Term/full-text tokenizers and vector similarity search
//! - [`oracle`] - Commit-visibility and id-ceiling counters
//! - [`engine`] - The engine trait

pub mod engine;
pub mod graph;
pub mod index;
pub mod oracle;

// Re-export commonly used types
pub use engine::{Engine, RESERVED_TS, RESERVED_UID};
pub use graph::{NamespaceStore, SchemaRegistry, TripleStore};
pub use oracle::Oracle;

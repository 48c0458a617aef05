//! # graphlet-common
//!
//! Foundation layer for Graphlet: identifiers, values, errors, and utilities.
//!
//! This crate provides the fundamental building blocks used by all other
//! Graphlet crates. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (Uid, Timestamp, Value, Record, Mutation)
//! - [`utils`] - Utility functions and helpers (hashing, errors, call context)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{
    IndexKind, Mutation, NamespaceId, Point, Record, SchemaUpdate, Timestamp, Tokenizer, Triple,
    Uid, Value, ValueKind, VectorMetric,
};
pub use utils::context::{CallContext, CancelHandle};
pub use utils::error::{Error, Result};

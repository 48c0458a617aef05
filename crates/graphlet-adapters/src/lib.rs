//! # graphlet-adapters
//!
//! Adapters layer for Graphlet: the bundled storage engine and the query
//! languages it speaks.
//!
//! ## Modules
//!
//! - [`storage`] - The local engine and its write-ahead log
//! - [`query`] - DQL parser and evaluator, schema-language parser

pub mod query;
pub mod storage;

pub use storage::LocalEngine;

//! Storage backends.
//!
//! - [`local`] - The bundled in-process engine
//! - [`wal`] - Write-ahead log used by the engine for durability

pub mod local;
pub mod wal;

pub use local::LocalEngine;

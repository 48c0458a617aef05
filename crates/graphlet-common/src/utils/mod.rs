//! Utility modules shared across the workspace.

pub mod context;
pub mod error;
pub mod hash;

//! Object-graph mapping.
//!
//! [`ObjectMapper`] turns records into mutations and schema directives,
//! resolving nested objects against existing entities through a
//! [`LinkLookup`]. [`ResultMapper`] turns query results back into records
//! and typed objects.

mod decode;
mod encode;

pub use decode::ResultMapper;
pub use encode::{Encoded, ObjectMapper, Target};

use graphlet_common::types::{Uid, Value};
use graphlet_common::utils::error::Result;

/// Finds existing entities by an indexed predicate value.
pub trait LinkLookup {
    /// Returns the entity holding `value` under `predicate`, if any.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    fn find(&self, predicate: &str, value: &Value) -> Result<Option<Uid>>;
}

/// A lookup that never finds anything.
pub struct NoLookup;

impl LinkLookup for NoLookup {
    fn find(&self, _predicate: &str, _value: &Value) -> Result<Option<Uid>> {
        Ok(None)
    }
}

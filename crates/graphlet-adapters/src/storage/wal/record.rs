//! WAL record types.

use graphlet_common::types::{Mutation, NamespaceId, SchemaUpdate, Timestamp, Uid};
use serde::{Deserialize, Serialize};

/// A durable change. Only committed work is logged, so replay applies
/// every record in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalRecord {
    /// Schema installed in a namespace.
    Schema {
        /// Target namespace.
        namespace: NamespaceId,
        /// Predicate definitions.
        updates: Vec<SchemaUpdate>,
    },
    /// A committed, type-checked mutation.
    Commit {
        /// Target namespace.
        namespace: NamespaceId,
        /// Commit timestamp the mutation became visible at.
        commit_ts: Timestamp,
        /// The prepared mutation.
        mutation: Mutation,
    },
    /// A write to the reserved bookkeeping record.
    Reserved {
        /// Reserved entity id.
        key: Uid,
        /// Version timestamp.
        ts: Timestamp,
        /// Opaque payload.
        data: Vec<u8>,
    },
    /// A namespace's data and schema were dropped.
    DropNamespace {
        /// Dropped namespace.
        namespace: NamespaceId,
    },
    /// Every namespace was dropped.
    DropAll,
}

impl WalRecord {
    /// Short record name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "schema",
            Self::Commit { .. } => "commit",
            Self::Reserved { .. } => "reserved",
            Self::DropNamespace { .. } => "drop_namespace",
            Self::DropAll => "drop_all",
        }
    }
}

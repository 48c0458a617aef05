//! Error types for Graphlet.
//!
//! Every fallible operation returns [`Result`]. Errors are never retried by
//! the library; retry policy belongs to the caller.

use std::fmt;
use thiserror::Error;

/// Result type alias for Graphlet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller supplied an object or argument of the wrong shape.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A lookup matched no entity.
    #[error("no object found")]
    NotFound,

    /// Leasing or persisting ids/timestamps failed.
    #[error("lease error: {0}")]
    Lease(String),

    /// An engine call failed.
    #[error("{op} failed: {source}")]
    Engine {
        /// The engine operation that failed.
        op: &'static str,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Query parsing or evaluation error.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database handle was closed.
    #[error("database is closed")]
    Closed,

    /// The call context was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The call context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// No namespace with the given id exists.
    #[error("namespace {0} not found")]
    NamespaceNotFound(u64),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wraps an engine failure with the name of the operation.
    ///
    /// Cancellation and closed-handle errors pass through unwrapped so
    /// callers can match on them directly.
    #[must_use]
    pub fn engine(op: &'static str, source: Error) -> Self {
        match source {
            Self::Cancelled | Self::DeadlineExceeded | Self::Closed | Self::Engine { .. } => {
                source
            }
            other => Self::Engine {
                op,
                source: Box::new(other),
            },
        }
    }

    /// Returns true for the "no object found" condition.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Caller errors detected before anything touches the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The input was not a struct-shaped object.
    #[error("expected struct, got {found}")]
    ExpectedStruct {
        /// Description of what was supplied instead.
        found: String,
    },

    /// A field value has no scalar kind in the engine.
    #[error("unsupported type {0}")]
    UnsupportedType(String),

    /// A type used as a nested object or write target has no indexed field.
    #[error("unique constraint not defined for any field on type {0}")]
    NoUniqueConstraint(String),

    /// Lookup was given the wrong number of keys.
    #[error("expected 1 argument, got {0}")]
    AmbiguousUniqueKey(usize),

    /// Lookup by a declared but unindexed field.
    #[error("constraint not defined for field {0}")]
    ConstraintNotDefined(String),

    /// A filter tree node is malformed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A vector index was declared on a field that is not a float vector.
    #[error("vector index declared on non-vector field {0}")]
    VectorIndexOnNonVector(String),

    /// A persistent configuration has no data directory.
    #[error("data directory is required")]
    EmptyDataDir,
}

/// Storage-level errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// On-disk data failed an integrity check.
    #[error("corruption: {0}")]
    Corruption(String),

    /// Commit for a start timestamp with nothing staged.
    #[error("no pending transaction at start timestamp {0}")]
    UnknownTransaction(u64),

    /// Commit timestamp not above the start timestamp.
    #[error("commit timestamp {commit} must exceed start timestamp {start}")]
    InvalidCommit {
        /// Start timestamp.
        start: u64,
        /// Commit timestamp.
        commit: u64,
    },

    /// Schema change conflicting with the installed schema.
    #[error("schema conflict: {0}")]
    SchemaConflict(String),

    /// A value violated a `@unique` predicate.
    #[error("could not insert duplicate value [{value}] with predicate {predicate}")]
    UniqueViolation {
        /// Predicate name.
        predicate: String,
        /// The duplicated value.
        value: String,
    },
}

/// Query error with position information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    /// What kind of failure.
    pub kind: QueryErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Byte offset in the query text, if known.
    pub position: Option<usize>,
}

impl QueryError {
    /// Creates a new query error.
    #[must_use]
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }

    /// Attaches a byte offset.
    #[must_use]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(pos) = self.position {
            write!(f, " at offset {pos}")?;
        }
        Ok(())
    }
}

impl std::error::Error for QueryError {}

/// Kind of query failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Malformed query text.
    Syntax,
    /// Reference to an unknown predicate or function.
    Semantic,
    /// A function needs an index the predicate does not have.
    MissingIndex,
    /// A result exceeded the configured limit.
    LimitExceeded,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "syntax error",
            Self::Semantic => "semantic error",
            Self::MissingIndex => "missing index",
            Self::LimitExceeded => "limit exceeded",
        })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Error::NotFound.to_string(), "no object found");
        assert_eq!(Error::Closed.to_string(), "database is closed");
        assert_eq!(Error::Cancelled.to_string(), "context cancelled");
        assert_eq!(
            Error::from(ValidationError::NoUniqueConstraint("Project".into())).to_string(),
            "unique constraint not defined for any field on type Project"
        );
        assert_eq!(
            Error::from(ValidationError::AmbiguousUniqueKey(2)).to_string(),
            "expected 1 argument, got 2"
        );
    }

    #[test]
    fn test_engine_wrapping() {
        let err = Error::engine("apply mutation", Error::Internal("boom".into()));
        assert_eq!(err.to_string(), "apply mutation failed: internal error: boom");

        assert!(matches!(
            Error::engine("query", Error::Cancelled),
            Error::Cancelled
        ));
    }

    #[test]
    fn test_query_error_display() {
        let err = QueryError::new(QueryErrorKind::Syntax, "expected '{'").with_position(4);
        assert_eq!(err.to_string(), "syntax error: expected '{' at offset 4");
    }
}

//! Mutations and schema updates, the write-side vocabulary shared by the
//! mapping layer and the engine.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use super::{Uid, Value, ValueKind};

/// Wildcard predicate used by delete triples to remove every predicate of
/// a subject.
pub const STAR: &str = "*";

/// One `(subject, predicate, object)` edge or attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    /// Subject entity.
    pub subject: Uid,
    /// Predicate name, `"<Type>.<field>"` for typed data.
    pub predicate: String,
    /// Object value; [`Value::Uid`] for edges.
    pub object: Value,
}

impl Triple {
    /// Creates a new triple.
    #[must_use]
    pub fn new(subject: Uid, predicate: impl Into<String>, object: impl Into<Value>) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Creates the `<subject> * *` delete triple.
    #[must_use]
    pub fn star(subject: Uid) -> Self {
        Self {
            subject,
            predicate: STAR.to_string(),
            object: Value::Null,
        }
    }

    /// Returns true if this is a wildcard delete.
    #[must_use]
    pub fn is_star(&self) -> bool {
        self.predicate == STAR
    }
}

/// A set of triples to add and remove in one transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Triples to write.
    pub set: Vec<Triple>,
    /// Triples to delete.
    pub del: Vec<Triple>,
}

impl Mutation {
    /// Creates an empty mutation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the mutation has nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.del.is_empty()
    }
}

/// Index tokenizer applied to a scalar predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tokenizer {
    /// Whole-value equality and ordering.
    Exact,
    /// Hashed equality.
    Hash,
    /// Whitespace-separated terms.
    Term,
    /// Stemmed full text with stop words removed.
    Fulltext,
    /// Trigrams, for regular expressions.
    Trigram,
    /// Integer ordering.
    Int,
    /// Float ordering.
    Float,
    /// Boolean equality.
    Bool,
    /// Datetime ordering.
    DateTime,
}

impl Tokenizer {
    /// Returns the schema-language name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Hash => "hash",
            Self::Term => "term",
            Self::Fulltext => "fulltext",
            Self::Trigram => "trigram",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::DateTime => "hour",
        }
    }

    /// Parses a schema-language tokenizer name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "exact" => Self::Exact,
            "hash" => Self::Hash,
            "term" => Self::Term,
            "fulltext" => Self::Fulltext,
            "trigram" => Self::Trigram,
            "int" => Self::Int,
            "float" => Self::Float,
            "bool" => Self::Bool,
            "year" | "month" | "day" | "hour" => Self::DateTime,
            _ => return None,
        })
    }

    /// Returns true if this tokenizer supports equality lookups.
    #[must_use]
    pub const fn supports_eq(&self) -> bool {
        !matches!(self, Self::Trigram | Self::Fulltext | Self::Term)
    }

    /// Returns the default ordering tokenizer for a scalar kind.
    #[must_use]
    pub const fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int => Self::Int,
            ValueKind::Float => Self::Float,
            ValueKind::Bool => Self::Bool,
            ValueKind::DateTime => Self::DateTime,
            _ => Self::Exact,
        }
    }
}

impl fmt::Display for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Distance metric of a vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VectorMetric {
    /// Cosine distance, `1 - cos(a, b)`.
    #[default]
    Cosine,
    /// Euclidean distance.
    Euclidean,
    /// Negated dot product.
    DotProduct,
}

impl VectorMetric {
    /// Returns the schema-language name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        }
    }

    /// Parses a schema-language metric name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cosine" => Some(Self::Cosine),
            "euclidean" => Some(Self::Euclidean),
            "dotproduct" => Some(Self::DotProduct),
            _ => None,
        }
    }

    /// Computes the distance between two vectors. Smaller is closer.
    ///
    /// Vectors of different lengths are compared over their common prefix.
    #[must_use]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
        let dot: f64 = a
            .iter()
            .zip(b)
            .map(|(x, y)| f64::from(*x) * f64::from(*y))
            .sum();
        match self {
            Self::Cosine => {
                let na = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
                let nb = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (na * nb)
                }
            }
            Self::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (f64::from(*x) - f64::from(*y)).powi(2))
                .sum::<f64>()
                .sqrt(),
            Self::DotProduct => -dot,
        }
    }
}

/// Index directive attached to a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// Exact-match index; usable as a link key.
    Exact,
    /// Hash index; usable as a link key.
    Hash,
    /// Term index.
    Term,
    /// Full-text index.
    Fulltext,
    /// Trigram index.
    Trigram,
    /// Exact index plus a uniqueness guarantee.
    Unique,
    /// Vector similarity index.
    Vector,
}

impl IndexKind {
    /// Parses the marker used in object declarations.
    #[must_use]
    pub fn from_marker(marker: &str) -> Option<Self> {
        Some(match marker {
            "exact" => Self::Exact,
            "hash" => Self::Hash,
            "term" => Self::Term,
            "fulltext" => Self::Fulltext,
            "trigram" => Self::Trigram,
            "unique" => Self::Unique,
            "vector" => Self::Vector,
            _ => return None,
        })
    }

    /// Returns true if this index makes the field usable as a link key for
    /// nested-object deduplication.
    #[must_use]
    pub const fn is_link_key(&self) -> bool {
        matches!(self, Self::Exact | Self::Hash | Self::Unique)
    }
}

/// Declared type and index directives of one predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaUpdate {
    /// Predicate name.
    pub predicate: String,
    /// Scalar kind.
    pub kind: ValueKind,
    /// Whether the predicate holds a list of values.
    pub list: bool,
    /// Index tokenizers.
    pub tokenizers: SmallVec<[Tokenizer; 2]>,
    /// Vector index metric, for float-vector predicates.
    pub vector_index: Option<VectorMetric>,
    /// Whether reverse edges are maintained.
    pub reverse: bool,
    /// Whether writes must check the index for conflicts.
    pub upsert: bool,
    /// Whether values must be unique across entities.
    pub unique: bool,
    /// Whether values may carry language tags (`name@en`).
    pub lang: bool,
}

impl SchemaUpdate {
    /// Creates an unindexed predicate of the given kind.
    #[must_use]
    pub fn new(predicate: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            predicate: predicate.into(),
            kind,
            list: false,
            tokenizers: SmallVec::new(),
            vector_index: None,
            reverse: false,
            upsert: false,
            unique: false,
            lang: false,
        }
    }

    /// Marks the predicate as a list.
    #[must_use]
    pub fn with_list(mut self) -> Self {
        self.list = true;
        self
    }

    /// Adds an index tokenizer.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        if !self.tokenizers.contains(&tokenizer) {
            self.tokenizers.push(tokenizer);
        }
        self
    }

    /// Adds a vector index.
    #[must_use]
    pub fn with_vector_index(mut self, metric: VectorMetric) -> Self {
        self.vector_index = Some(metric);
        self
    }

    /// Maintains reverse edges.
    #[must_use]
    pub fn with_reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Allows language-tagged values.
    #[must_use]
    pub fn with_lang(mut self) -> Self {
        self.lang = true;
        self
    }

    /// Marks the predicate as unique.
    #[must_use]
    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self.upsert = true;
        self
    }

    /// Returns true if any index is declared.
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        !self.tokenizers.is_empty() || self.vector_index.is_some()
    }

    /// Returns true if the predicate has the given tokenizer.
    #[must_use]
    pub fn has_tokenizer(&self, tokenizer: Tokenizer) -> bool {
        self.tokenizers.contains(&tokenizer)
    }
}

impl fmt::Display for SchemaUpdate {
    /// Renders the update as one schema-language line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.predicate)?;
        if self.list {
            write!(f, "[{}]", self.kind)?;
        } else {
            write!(f, "{}", self.kind)?;
        }
        if let Some(metric) = self.vector_index {
            write!(f, " @index(hnsw(metric:\"{}\"))", metric.name())?;
        } else if !self.tokenizers.is_empty() {
            let names: Vec<&str> = self.tokenizers.iter().map(Tokenizer::name).collect();
            write!(f, " @index({})", names.join(", "))?;
        }
        if self.reverse {
            f.write_str(" @reverse")?;
        }
        if self.lang {
            f.write_str(" @lang")?;
        }
        if self.unique {
            f.write_str(" @unique")?;
        }
        if self.upsert {
            f.write_str(" @upsert")?;
        }
        f.write_str(" .")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_line() {
        let update = SchemaUpdate::new("User.name", ValueKind::String)
            .with_tokenizer(Tokenizer::Exact)
            .with_tokenizer(Tokenizer::Exact);
        assert_eq!(update.to_string(), "User.name: string @index(exact) .");

        let vec = SchemaUpdate::new("Doc.vec", ValueKind::Vector)
            .with_vector_index(VectorMetric::Cosine);
        assert_eq!(
            vec.to_string(),
            "Doc.vec: float32vector @index(hnsw(metric:\"cosine\")) ."
        );

        let edge = SchemaUpdate::new("Branch.proj", ValueKind::Uid).with_reverse();
        assert_eq!(edge.to_string(), "Branch.proj: uid @reverse .");

        let name = SchemaUpdate::new("name", ValueKind::String)
            .with_tokenizer(Tokenizer::Term)
            .with_lang();
        assert_eq!(name.to_string(), "name: string @index(term) @lang .");
    }

    #[test]
    fn test_cosine_distance() {
        let m = VectorMetric::Cosine;
        assert!(m.distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-9);
        assert!((m.distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
        assert!((m.distance(&[0.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_link_keys() {
        assert!(IndexKind::Unique.is_link_key());
        assert!(IndexKind::Exact.is_link_key());
        assert!(!IndexKind::Term.is_link_key());
        assert!(!IndexKind::Vector.is_link_key());
    }

    #[test]
    fn test_star_triple() {
        assert!(Triple::star(Uid::new(3)).is_star());
        assert!(Mutation::new().is_empty());
    }
}

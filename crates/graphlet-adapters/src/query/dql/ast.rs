//! DQL Abstract Syntax Tree.

use graphlet_common::types::{Uid, Value};

/// A parsed request: one or more named blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Blocks in source order.
    pub blocks: Vec<Block>,
}

/// A top-level block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A data query block.
    Query(QueryBlock),
    /// A `schema(...) { ... }` block.
    Schema(SchemaBlock),
}

/// A data query block such as `objs(func: type("User"), first: 3) { uid }`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBlock {
    /// Block name; also the key of the block's result array.
    pub name: String,
    /// Root function selecting the candidate entities.
    pub root: Function,
    /// Maximum number of results.
    pub first: Option<usize>,
    /// Number of results to skip.
    pub offset: Option<usize>,
    /// Only return entities with a larger id.
    pub after: Option<Uid>,
    /// Sort keys in priority order.
    pub order: Vec<OrderKey>,
    /// Optional `@filter(...)`.
    pub filter: Option<FilterExpr>,
    /// `@normalize`: return only aliased fields, flattened into one row
    /// per path through the nested edges.
    pub normalize: bool,
    /// Fields to return per entity.
    pub selection: Vec<Selection>,
}

/// One `orderasc`/`orderdesc` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    /// Predicate to sort by.
    pub predicate: String,
    /// Sort descending.
    pub descending: bool,
}

/// A `schema(pred: [...]) { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaBlock {
    /// Predicates to report; empty means all.
    pub predicates: Vec<String>,
    /// Attributes to report; empty means all.
    pub fields: Vec<String>,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `eq`
    Eq,
    /// `lt`
    Lt,
    /// `le`
    Le,
    /// `gt`
    Gt,
    /// `ge`
    Ge,
}

impl CompareOp {
    /// Parses a function name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "eq" => Self::Eq,
            "lt" => Self::Lt,
            "le" => Self::Le,
            "gt" => Self::Gt,
            "ge" => Self::Ge,
            _ => return None,
        })
    }
}

/// A root or filter function.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// `uid(0x1, 0x2)`
    Uid(Vec<Uid>),
    /// `type("User")`
    Type(String),
    /// `has(pred)`
    Has(String),
    /// `eq/lt/le/gt/ge(pred, value)`
    Compare {
        /// Operator.
        op: CompareOp,
        /// Predicate.
        predicate: String,
        /// Literal compared against, converted to the predicate's kind.
        value: Value,
    },
    /// `allofterms/anyofterms(pred, "a b")`
    Terms {
        /// `allofterms` when true.
        all: bool,
        /// Predicate.
        predicate: String,
        /// Space-separated terms.
        text: String,
    },
    /// `alloftext/anyoftext(pred, "a b")`
    Text {
        /// `alloftext` when true.
        all: bool,
        /// Predicate.
        predicate: String,
        /// Free text.
        text: String,
    },
    /// `regexp(pred, /pattern/flags)`
    Regexp {
        /// Predicate.
        predicate: String,
        /// Pattern.
        pattern: String,
        /// Flags; `i` makes matching case-insensitive.
        flags: String,
    },
    /// `similar_to(pred, k, "[0.1, 0.2]")`
    SimilarTo {
        /// Vector predicate.
        predicate: String,
        /// Number of neighbours.
        k: usize,
        /// Probe vector.
        vector: Vec<f32>,
    },
}

/// A filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Both sides match.
    And(Box<FilterExpr>, Box<FilterExpr>),
    /// Either side matches.
    Or(Box<FilterExpr>, Box<FilterExpr>),
    /// The inner expression does not match.
    Not(Box<FilterExpr>),
    /// A function test.
    Func(Function),
}

/// One entry in a block's selection set.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// `uid`
    Uid,
    /// `pred`, `alias: pred`, or `pred { ... }`.
    Predicate {
        /// Output key override.
        alias: Option<String>,
        /// Predicate name.
        name: String,
        /// Child selection for uid edges.
        children: Option<Vec<Selection>>,
    },
    /// `expand(_all_) { ... }`
    ExpandAll {
        /// Child selection for uid edges.
        children: Option<Vec<Selection>>,
    },
    /// `alias: ~pred { ... }`
    Reverse {
        /// Output key; `~pred` when absent.
        alias: Option<String>,
        /// Forward predicate to follow backwards.
        predicate: String,
        /// Child selection.
        children: Vec<Selection>,
    },
}

//! Query language adapters.
//!
//! - [`dql`] - DQL lexer, parser and evaluator
//! - [`schema`] - Schema-language parser
//! - [`rdf`] - N-Quad reader for bulk loads

pub mod dql;
pub mod rdf;
pub mod schema;

pub use rdf::parse_nquads;
pub use schema::parse_schema;

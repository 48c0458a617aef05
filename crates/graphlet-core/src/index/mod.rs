//! Index helpers for the query evaluator.
//!
//! - [`tokenizer`] - Term and full-text tokenization
//! - [`vector`] - Nearest-neighbour search over float vectors

pub mod tokenizer;
pub mod vector;

//! DQL: the graph query language the mapping layer speaks to the engine.
//!
//! ```text
//! {
//!   objs(func: type("User"), first: 10, orderasc: User.name)
//!     @filter(ge(User.age, 18) AND NOT has(User.banned)) {
//!     uid
//!     expand(_all_)
//!     reports: ~User.manager { uid }
//!   }
//! }
//! ```
//!
//! [`parse`] turns text into a [`Request`]; [`Executor`] evaluates it.

mod ast;
mod executor;
mod lexer;
mod parser;

pub use ast::*;
pub use executor::{DEFAULT_NORMALIZE_LIMIT, Executor};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{Parser, parse};

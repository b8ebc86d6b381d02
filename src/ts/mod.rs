//! Tree-sitter integration: languages, parsing, node navigation, predicate
//! compilation and structural queries.
//!
//! Every handle here is tied to the [`Tree`] it came from, so node text is
//! always read from the exact source the tree was parsed from.

pub mod cursor;
pub mod errors;
pub mod language;
pub mod node;
pub mod parser;
pub mod predicate;
pub mod query;
pub mod search;
pub mod steps;

pub use cursor::Cursor;
pub use errors::{QueryError, TreeSitterError};
pub use language::{Language, Syntax};
pub use node::Node;
pub use parser::{ErrorNode, Parser, Tree};
pub use predicate::{Operand, OperandKind, PredicateResult, Properties, TextPredicate};
pub use query::{Capture, Captures, Match, Matches, Query, QueryOptions, QueryRange};
pub use tree_sitter::{InputEdit, Point};

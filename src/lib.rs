//! Structural Query: tree-sitter queries with executable predicates
//!
//! A thin, strongly typed layer over tree-sitter for searching syntax trees:
//! languages and their symbol/field catalogs, parsing, node navigation,
//! compiled queries with text predicates, and range-pruned descendant search.
//!
//! # Architecture
//!
//! Queries compile in two halves. Predicate groups such as `(#eq? @a "x")`
//! are lifted out of the query source and compiled by
//! [`ts::predicate`] into owned [`TextPredicate`]s, generic
//! [`PredicateResult`]s and property maps; the remaining structural patterns
//! go to the tree-sitter engine. At execution time every candidate match from
//! the engine is filtered through its pattern's text predicates.
//!
//! # Example
//!
//! ```no_run
//! use structural_query::ts::{Language, Parser, QueryOptions, Syntax};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut parser = Parser::new(Syntax::JavaScript)?;
//! let tree = parser.parse("x = 1; y = 2;")?;
//!
//! let mut query = Language::new(Syntax::JavaScript)
//!     .query(r#"((identifier) @id (#eq? @id "x"))"#)?;
//! let result = query.matches(&tree.root_node(), &QueryOptions::default());
//!
//! assert_eq!(result.matches.len(), 1);
//! assert!(!result.exceeded_match_limit);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pool;
pub mod ts;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, QueryConfig};
pub use ts::{
    Capture, Captures, Cursor, Language, Match, Matches, Node, Parser, PredicateResult, Query,
    QueryError, QueryOptions, QueryRange, Syntax, TextPredicate, Tree, TreeSitterError,
};

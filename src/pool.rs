//! Thread-local parser pooling.
//!
//! Each thread keeps one [`Parser`] per [`Syntax`], created on first use and
//! reused afterwards.

use crate::ts::{Parser, Syntax, Tree, TreeSitterError};
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

thread_local! {
    static PARSERS: RefCell<HashMap<Syntax, Parser>> = RefCell::new(HashMap::new());
}

/// Execute `f` with the pooled parser for `syntax`.
///
/// `f` must not call back into the pool.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use structural_query::pool::with_parser;
/// use structural_query::ts::Syntax;
///
/// let tree = with_parser(Syntax::Rust, |parser| parser.parse("fn main() {}"))??;
/// assert_eq!(tree.root_node().kind(), "source_file");
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(syntax: Syntax, f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut Parser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(syntax) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::trace!(target: "structural_query::pool", %syntax, "parser.created");
                entry.insert(Parser::new(syntax)?)
            }
        };
        Ok(f(parser))
    })
}

/// Parse `source` with the pooled parser for `syntax`.
pub fn parse(syntax: Syntax, source: impl Into<String>) -> Result<Tree, TreeSitterError> {
    with_parser(syntax, |parser| parser.parse(source))?
}

use crate::ts::cursor::Cursor;
use crate::ts::errors::TreeSitterError;
use crate::ts::language::{Language, Syntax};
use crate::ts::node::Node;
use tree_sitter::{InputEdit, LogType, Point, Range};

/// Tree-sitter parser bound to one [`Language`].
pub struct Parser {
    parser: tree_sitter::Parser,
    language: Language,
}

impl Parser {
    /// Create a parser for a built-in syntax.
    pub fn new(syntax: Syntax) -> Result<Self, TreeSitterError> {
        Self::with_language(Language::new(syntax))
    }

    /// Create a parser for any language, rejecting grammars whose ABI version
    /// the engine cannot load.
    pub fn with_language(language: Language) -> Result<Self, TreeSitterError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(language.raw())
            .map_err(|_| TreeSitterError::language_set(language.syntax(), language.version()))?;

        Ok(Self { parser, language })
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Switch grammars. On failure the previous language stays active.
    pub fn set_language(&mut self, language: Language) -> Result<(), TreeSitterError> {
        self.parser
            .set_language(language.raw())
            .map_err(|_| TreeSitterError::language_set(language.syntax(), language.version()))?;
        self.language = language;
        Ok(())
    }

    /// Forward engine parse/lex log lines to `tracing` at trace level.
    pub fn with_trace_logging(mut self) -> Self {
        self.parser.set_logger(Some(Box::new(|kind, message| {
            let kind = match kind {
                LogType::Parse => "parse",
                LogType::Lex => "lex",
            };
            tracing::trace!(target: "structural_query::engine", kind, "{message}");
        })));
        self
    }

    pub fn reset_logger(&mut self) {
        self.parser.set_logger(None);
    }

    /// Discard any partially completed parse.
    pub fn reset(&mut self) {
        self.parser.reset();
    }

    /// Parse source code into a [`Tree`] that owns a copy of the text.
    pub fn parse(&mut self, source: impl Into<String>) -> Result<Tree, TreeSitterError> {
        self.parse_inner(source.into(), None)
    }

    /// Re-parse edited source, reusing the unchanged parts of `old_tree`.
    ///
    /// `old_tree` must already have been [`Tree::edit`]ed to describe the
    /// change.
    pub fn reparse(
        &mut self,
        old_tree: &Tree,
        source: impl Into<String>,
    ) -> Result<Tree, TreeSitterError> {
        self.parse_inner(source.into(), Some(&old_tree.raw))
    }

    fn parse_inner(
        &mut self,
        source: String,
        old_tree: Option<&tree_sitter::Tree>,
    ) -> Result<Tree, TreeSitterError> {
        let raw = self
            .parser
            .parse(&source, old_tree)
            .ok_or(TreeSitterError::ParseFailed)?;

        Ok(Tree {
            raw,
            language: self.language.clone(),
            source,
        })
    }
}

/// A syntax tree together with the text it was parsed from.
#[derive(Clone)]
pub struct Tree {
    raw: tree_sitter::Tree,
    language: Language,
    source: String,
}

impl Tree {
    pub fn root_node(&self) -> Node<'_> {
        Node::new(self, self.raw.root_node())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn raw(&self) -> &tree_sitter::Tree {
        &self.raw
    }

    /// Text covered by a byte range, or `""` when the range no longer fits
    /// the stored source (e.g. after an edit).
    pub fn text_for(&self, range: std::ops::Range<usize>) -> &str {
        self.source.get(range).unwrap_or("")
    }

    /// Shift node ranges in place to describe a text modification.
    ///
    /// Taking `&mut self` guarantees no node handed out before the edit is
    /// still alive.
    pub fn edit(&mut self, edit: &InputEdit) {
        self.raw.edit(edit);
    }

    /// Ranges whose syntactic structure differs between `self` (an edited old
    /// tree) and `other` (the re-parsed tree).
    pub fn changed_ranges(&self, other: &Tree) -> Vec<Range> {
        self.raw.changed_ranges(&other.raw).collect()
    }

    pub fn walk(&self) -> Cursor<'_> {
        Cursor::new(self, self.raw.walk())
    }

    pub fn has_errors(&self) -> bool {
        self.raw.root_node().has_error()
    }

    /// All ERROR and MISSING nodes, in document order.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        let mut cursor = self.raw.walk();
        let mut visited_children = false;
        loop {
            let node = cursor.node();
            if !visited_children {
                if node.is_error() || node.is_missing() {
                    errors.push(ErrorNode {
                        byte_start: node.start_byte(),
                        byte_end: node.end_byte(),
                        start_point: node.start_position(),
                        end_point: node.end_position(),
                    });
                }
                if node.has_error() && cursor.goto_first_child() {
                    continue;
                }
            }
            if cursor.goto_next_sibling() {
                visited_children = false;
            } else if cursor.goto_parent() {
                visited_children = true;
            } else {
                break;
            }
        }
        errors
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("language", &self.language)
            .field("source_len", &self.source.len())
            .field("root", &self.raw.root_node().to_sexp())
            .finish()
    }
}

/// Information about an ERROR or MISSING node in the parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: Point,
    pub end_point: Point,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_source() {
        let mut parser = Parser::new(Syntax::Rust).unwrap();
        let tree = parser.parse("fn main() { println!(\"hello\"); }").unwrap();

        assert!(!tree.has_errors());
        assert_eq!(tree.root_node().kind(), "source_file");
        assert_eq!(tree.language().syntax(), Some(Syntax::Rust));
    }

    #[test]
    fn parse_invalid_source() {
        let mut parser = Parser::new(Syntax::Rust).unwrap();
        let tree = parser.parse("fn main( { }").unwrap();

        assert!(tree.has_errors());
        assert!(!tree.error_nodes().is_empty());
    }

    #[test]
    fn switches_language() {
        let mut parser = Parser::new(Syntax::Rust).unwrap();
        parser.set_language(Language::new(Syntax::Python)).unwrap();
        let tree = parser.parse("def f():\n    return 1\n").unwrap();
        assert_eq!(tree.root_node().kind(), "module");
    }

    #[test]
    fn trace_logging_does_not_change_results() {
        let mut parser = Parser::new(Syntax::JavaScript)
            .unwrap()
            .with_trace_logging();
        let logged = parser.parse("a + 1").unwrap();
        parser.reset_logger();
        let plain = parser.parse("a + 1").unwrap();
        assert_eq!(logged.root_node().to_sexp(), plain.root_node().to_sexp());
    }

    #[test]
    fn edit_and_reparse_reports_changed_ranges() {
        let mut parser = Parser::new(Syntax::JavaScript).unwrap();
        let source = "let a = 1;";
        let mut old = parser.parse(source).unwrap();

        // "1" -> "(1 + 2)"
        let new_source = "let a = (1 + 2);";
        old.edit(&InputEdit {
            start_byte: 8,
            old_end_byte: 9,
            new_end_byte: 15,
            start_position: Point::new(0, 8),
            old_end_position: Point::new(0, 9),
            new_end_position: Point::new(0, 15),
        });
        let new = parser.reparse(&old, new_source).unwrap();

        assert_eq!(new.source(), new_source);
        assert!(!new.has_errors());
        let changed = old.changed_ranges(&new);
        assert!(!changed.is_empty());
    }
}

use crate::ts::node::Node;
use crate::ts::parser::Tree;
use tree_sitter::{Point, TreeCursor};

/// A tree cursor that knows the source text and catalog of its tree.
#[derive(Clone)]
pub struct Cursor<'tree> {
    tree: &'tree Tree,
    raw: TreeCursor<'tree>,
}

impl<'tree> Cursor<'tree> {
    pub(crate) fn new(tree: &'tree Tree, raw: TreeCursor<'tree>) -> Self {
        Self { tree, raw }
    }

    /// Re-root the cursor at `node`.
    pub fn reset(&mut self, node: &Node<'tree>) {
        self.raw.reset(node.raw());
    }

    pub fn current_node(&self) -> Node<'tree> {
        Node::new(self.tree, self.raw.node())
    }

    pub fn node_type(&self) -> &'static str {
        self.raw.node().kind()
    }

    pub fn node_type_id(&self) -> u16 {
        self.raw.node().kind_id()
    }

    pub fn node_id(&self) -> usize {
        self.raw.node().id()
    }

    pub fn node_is_named(&self) -> bool {
        self.raw.node().is_named()
    }

    pub fn node_is_missing(&self) -> bool {
        self.raw.node().is_missing()
    }

    pub fn node_text(&self) -> &'tree str {
        self.tree.text_for(self.raw.node().byte_range())
    }

    pub fn start_position(&self) -> Point {
        self.raw.node().start_position()
    }

    pub fn end_position(&self) -> Point {
        self.raw.node().end_position()
    }

    pub fn start_index(&self) -> usize {
        self.raw.node().start_byte()
    }

    pub fn end_index(&self) -> usize {
        self.raw.node().end_byte()
    }

    /// Field the current node occupies in its parent, if any.
    pub fn current_field_name(&self) -> Option<&'static str> {
        self.raw.field_name()
    }

    pub fn current_field_id(&self) -> Option<u16> {
        self.current_field_name()
            .and_then(|name| self.tree.language().field_id_for_name(name))
    }

    pub fn goto_parent(&mut self) -> bool {
        self.raw.goto_parent()
    }

    pub fn goto_first_child(&mut self) -> bool {
        self.raw.goto_first_child()
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        self.raw.goto_next_sibling()
    }
}

#[cfg(test)]
mod tests {
    use crate::ts::{Parser, Syntax};

    #[test]
    fn walks_and_reports_fields() {
        let mut parser = Parser::new(Syntax::JavaScript).unwrap();
        let tree = parser.parse("const mysum = 2 * 2").unwrap();
        let mut cursor = tree.walk();

        assert_eq!(cursor.node_type(), "program");
        assert!(cursor.goto_first_child());
        assert_eq!(cursor.node_type(), "lexical_declaration");
        assert!(cursor.goto_first_child());
        assert_eq!(cursor.node_text(), "const");
        assert!(!cursor.node_is_named());
        assert!(cursor.goto_next_sibling());
        assert_eq!(cursor.node_type(), "variable_declarator");
        assert!(cursor.goto_first_child());
        assert_eq!(cursor.current_field_name(), Some("name"));
        assert_eq!(
            cursor.current_field_id(),
            tree.language().field_id_for_name("name")
        );
        assert_eq!(cursor.node_text(), "mysum");
        assert_eq!((cursor.start_index(), cursor.end_index()), (6, 11));

        assert!(cursor.goto_parent());
        assert!(cursor.goto_parent());
        assert!(cursor.goto_parent());
        assert!(!cursor.goto_parent());
    }

    #[test]
    fn reset_reroots_cursor() {
        let mut parser = Parser::new(Syntax::JavaScript).unwrap();
        let tree = parser.parse("a = 1 + 2").unwrap();
        let numbers = tree.root_node().descendants_of_kind("number");
        let mut cursor = tree.walk();

        cursor.reset(&numbers[1]);
        assert_eq!(cursor.current_node(), numbers[1]);
        assert!(!cursor.goto_parent());
    }
}

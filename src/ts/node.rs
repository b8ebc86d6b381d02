use crate::ts::cursor::Cursor;
use crate::ts::parser::Tree;
use crate::ts::search;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use tree_sitter::{Point, TreeCursor};

/// A node bound to the [`Tree`] (and source text) it came from.
///
/// Children and named children are collected on first access and cached.
/// Child enumeration and [`descendants_of_type`](Node::descendants_of_type)
/// share one traversal cursor owned by the node, so a `Node` is not `Sync`.
pub struct Node<'tree> {
    tree: &'tree Tree,
    raw: tree_sitter::Node<'tree>,
    children: OnceCell<Vec<Node<'tree>>>,
    named_children: OnceCell<Vec<Node<'tree>>>,
    cursor: RefCell<Option<TreeCursor<'tree>>>,
}

impl<'tree> Node<'tree> {
    pub(crate) fn new(tree: &'tree Tree, raw: tree_sitter::Node<'tree>) -> Self {
        Self {
            tree,
            raw,
            children: OnceCell::new(),
            named_children: OnceCell::new(),
            cursor: RefCell::new(None),
        }
    }

    fn wrap(&self, raw: tree_sitter::Node<'tree>) -> Node<'tree> {
        Node::new(self.tree, raw)
    }

    fn with_cursor<R>(&self, f: impl FnOnce(&mut TreeCursor<'tree>) -> R) -> R {
        let mut slot = self.cursor.borrow_mut();
        let cursor = slot.get_or_insert_with(|| self.raw.walk());
        cursor.reset(self.raw);
        f(cursor)
    }

    pub fn raw(&self) -> tree_sitter::Node<'tree> {
        self.raw
    }

    pub fn tree(&self) -> &'tree Tree {
        self.tree
    }

    pub fn id(&self) -> usize {
        self.raw.id()
    }

    /// Node type name.
    pub fn kind(&self) -> &'static str {
        self.raw.kind()
    }

    /// Node type symbol id.
    pub fn kind_id(&self) -> u16 {
        self.raw.kind_id()
    }

    /// Source text covered by this node.
    pub fn text(&self) -> &'tree str {
        self.tree.text_for(self.raw.byte_range())
    }

    pub fn start_byte(&self) -> usize {
        self.raw.start_byte()
    }

    pub fn end_byte(&self) -> usize {
        self.raw.end_byte()
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.raw.byte_range()
    }

    pub fn start_position(&self) -> Point {
        self.raw.start_position()
    }

    pub fn end_position(&self) -> Point {
        self.raw.end_position()
    }

    pub fn is_named(&self) -> bool {
        self.raw.is_named()
    }

    pub fn is_missing(&self) -> bool {
        self.raw.is_missing()
    }

    pub fn is_error(&self) -> bool {
        self.raw.is_error()
    }

    pub fn has_error(&self) -> bool {
        self.raw.has_error()
    }

    pub fn has_changes(&self) -> bool {
        self.raw.has_changes()
    }

    /// S-expression rendering of the subtree.
    pub fn to_sexp(&self) -> String {
        self.raw.to_sexp()
    }

    pub fn parent(&self) -> Option<Node<'tree>> {
        self.raw.parent().map(|n| self.wrap(n))
    }

    pub fn child_count(&self) -> usize {
        self.raw.child_count()
    }

    pub fn named_child_count(&self) -> usize {
        self.raw.named_child_count()
    }

    pub fn children(&self) -> &[Node<'tree>] {
        self.children.get_or_init(|| {
            self.with_cursor(|cursor| self.raw.children(cursor).map(|n| self.wrap(n)).collect())
        })
    }

    pub fn named_children(&self) -> &[Node<'tree>] {
        self.named_children.get_or_init(|| {
            self.with_cursor(|cursor| {
                self.raw
                    .named_children(cursor)
                    .map(|n| self.wrap(n))
                    .collect()
            })
        })
    }

    pub fn child(&self, index: usize) -> Option<Node<'tree>> {
        self.children().get(index).cloned()
    }

    pub fn named_child(&self, index: usize) -> Option<Node<'tree>> {
        self.named_children().get(index).cloned()
    }

    pub fn first_child(&self) -> Option<Node<'tree>> {
        self.children().first().cloned()
    }

    pub fn last_child(&self) -> Option<Node<'tree>> {
        self.children().last().cloned()
    }

    pub fn first_named_child(&self) -> Option<Node<'tree>> {
        self.named_children().first().cloned()
    }

    pub fn last_named_child(&self) -> Option<Node<'tree>> {
        self.named_children().last().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node<'tree>> {
        self.raw.next_sibling().map(|n| self.wrap(n))
    }

    pub fn prev_sibling(&self) -> Option<Node<'tree>> {
        self.raw.prev_sibling().map(|n| self.wrap(n))
    }

    pub fn next_named_sibling(&self) -> Option<Node<'tree>> {
        self.raw.next_named_sibling().map(|n| self.wrap(n))
    }

    pub fn prev_named_sibling(&self) -> Option<Node<'tree>> {
        self.raw.prev_named_sibling().map(|n| self.wrap(n))
    }

    pub fn child_by_field_id(&self, field_id: u16) -> Option<Node<'tree>> {
        self.raw.child_by_field_id(field_id).map(|n| self.wrap(n))
    }

    /// Child for a field name; `None` when the language has no such field.
    pub fn child_by_field_name(&self, field_name: &str) -> Option<Node<'tree>> {
        let field_id = self.tree.language().field_id_for_name(field_name)?;
        self.child_by_field_id(field_id)
    }

    /// Smallest node spanning `[start, end]` bytes. A reversed range is
    /// clamped to `start`.
    pub fn descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Node<'tree>> {
        self.raw
            .descendant_for_byte_range(start, end.max(start))
            .map(|n| self.wrap(n))
    }

    pub fn named_descendant_for_byte_range(
        &self,
        start: usize,
        end: usize,
    ) -> Option<Node<'tree>> {
        self.raw
            .named_descendant_for_byte_range(start, end.max(start))
            .map(|n| self.wrap(n))
    }

    pub fn descendant_for_point_range(&self, start: Point, end: Point) -> Option<Node<'tree>> {
        self.raw
            .descendant_for_point_range(start, end)
            .map(|n| self.wrap(n))
    }

    pub fn named_descendant_for_point_range(
        &self,
        start: Point,
        end: Point,
    ) -> Option<Node<'tree>> {
        self.raw
            .named_descendant_for_point_range(start, end)
            .map(|n| self.wrap(n))
    }

    /// Descendants (including this node) whose type is one of `types` and
    /// whose span overlaps `[start, end)`, in document order.
    ///
    /// An `end` of `(0, 0)` means "to the end of the tree". Unknown type
    /// names never match.
    pub fn descendants_of_type<S: AsRef<str>>(
        &self,
        types: &[S],
        start: Point,
        end: Point,
    ) -> Vec<Node<'tree>> {
        let symbols = self.tree.language().symbols_for_names(types);
        if symbols.is_empty() {
            return Vec::new();
        }

        let found = self.with_cursor(|cursor| {
            search::descendants_of_type(cursor, &symbols, start, end)
        });

        tracing::trace!(
            target: "structural_query::search",
            symbols = symbols.len(),
            found = found.len(),
            "descendants_of_type"
        );

        found.into_iter().map(|n| self.wrap(n)).collect()
    }

    /// [`descendants_of_type`](Node::descendants_of_type) over the whole
    /// subtree for a single type.
    pub fn descendants_of_kind(&self, kind: &str) -> Vec<Node<'tree>> {
        self.descendants_of_type(&[kind], Point::default(), Point::default())
    }

    pub fn walk(&self) -> Cursor<'tree> {
        Cursor::new(self.tree, self.raw.walk())
    }
}

impl Clone for Node<'_> {
    fn clone(&self) -> Self {
        Node::new(self.tree, self.raw)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}] - [{}, {}]",
            self.kind(),
            self.start_position().row,
            self.start_position().column,
            self.end_position().row,
            self.end_position().column
        )
    }
}

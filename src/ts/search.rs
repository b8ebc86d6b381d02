//! Range-pruned descendant search.
//!
//! A pre-order walk driven by a single [`TreeCursor`] and a "returning from
//! children" flag. Subtrees that end before the window are skipped without
//! being entered, and the walk stops at the first node that starts after the
//! window, so the cost is bounded by the nodes that overlap it.

use std::collections::HashSet;
use tree_sitter::{Point, TreeCursor};

/// End position used when the caller passes the `(0, 0)` sentinel.
pub const UNBOUNDED: Point = Point {
    row: usize::MAX,
    column: usize::MAX,
};

fn point_lte(a: Point, b: Point) -> bool {
    (a.row, a.column) <= (b.row, b.column)
}

/// Where the cursor goes after handling the current node.
enum Step {
    /// Moved to a node not yet visited.
    Enter,
    /// Climbed back to a parent whose children are done.
    Return,
    Finished,
}

fn advance(cursor: &mut TreeCursor<'_>) -> Step {
    if cursor.goto_next_sibling() {
        Step::Enter
    } else if cursor.goto_parent() {
        Step::Return
    } else {
        Step::Finished
    }
}

/// Collect the nodes under the cursor's current node whose symbol is in
/// `symbols` and whose span overlaps `[start, end)`, in document order.
///
/// `end == (0, 0)` means unbounded. The cursor is left somewhere inside the
/// subtree; callers reset it before reuse.
pub fn descendants_of_type<'tree>(
    cursor: &mut TreeCursor<'tree>,
    symbols: &HashSet<u16>,
    start: Point,
    end: Point,
) -> Vec<tree_sitter::Node<'tree>> {
    let end = if end == Point::new(0, 0) { UNBOUNDED } else { end };
    let mut result = Vec::new();
    let mut visited_children = false;

    loop {
        let node = cursor.node();

        let step = if visited_children {
            advance(cursor)
        } else if point_lte(node.end_position(), start) {
            advance(cursor)
        } else if point_lte(end, node.start_position()) {
            Step::Finished
        } else {
            if symbols.contains(&node.kind_id()) {
                result.push(node);
            }
            if cursor.goto_first_child() {
                Step::Enter
            } else {
                advance(cursor)
            }
        };

        match step {
            Step::Enter => visited_children = false,
            Step::Return => visited_children = true,
            Step::Finished => break,
        }
    }

    result
}

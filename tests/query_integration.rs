//! Query construction and execution across languages.

use structural_query::ts::{
    Language, OperandKind, Parser, Point, QueryError, QueryOptions, QueryRange, Syntax,
};

fn parse(syntax: Syntax, source: &str) -> structural_query::Tree {
    Parser::new(syntax).unwrap().parse(source).unwrap()
}

#[test]
fn predicate_free_query_returns_engine_matches() {
    let tree = parse(
        Syntax::Rust,
        "fn alpha() {}\nfn beta(x: u32) -> u32 { x }\n",
    );
    let mut query = Language::new(Syntax::Rust)
        .query("(function_item name: (identifier) @name) @function")
        .unwrap();

    let result = query.matches(&tree.root_node(), &QueryOptions::default());
    assert_eq!(result.matches.len(), 2);

    let names: Vec<&str> = result
        .matches
        .iter()
        .map(|m| {
            m.captures
                .iter()
                .find(|c| &*c.name == "name")
                .unwrap()
                .node
                .text()
        })
        .collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert!(result.matches.iter().all(|m| m.pattern == 0));
}

#[test]
fn eq_between_captures_in_python() {
    let tree = parse(
        Syntax::Python,
        "a = a\nb = c\nself.x = self.x\n",
    );
    let mut query = Language::new(Syntax::Python)
        .query("(assignment left: (_) @left right: (_) @right (#eq? @left @right))")
        .unwrap();

    let texts: Vec<String> = query
        .matches(&tree.root_node(), &QueryOptions::default())
        .matches
        .iter()
        .map(|m| m.captures[0].node.text().to_string())
        .collect();
    assert_eq!(texts, vec!["a", "self.x"]);
}

#[test]
fn captures_are_filtered_by_whole_match() {
    let tree = parse(Syntax::JavaScript, "foo(1); bar(2); foo(3);");
    let mut query = Language::new(Syntax::JavaScript)
        .query(
            r#"(call_expression
                 function: (identifier) @fn
                 arguments: (arguments (number) @arg)
                 (#eq? @fn "foo"))"#,
        )
        .unwrap();

    let captures = query
        .captures(&tree.root_node(), &QueryOptions::default())
        .captures;
    let texts: Vec<(&str, &str)> = captures
        .iter()
        .map(|c| (&*c.name, c.node.text()))
        .collect();
    assert_eq!(
        texts,
        vec![("fn", "foo"), ("arg", "1"), ("fn", "foo"), ("arg", "3")]
    );
}

#[test]
fn several_patterns_keep_their_own_predicates() {
    let source = "(identifier) @plain\n\
                  ((identifier) @upper (#match? @upper \"^[A-Z]\"))\n\
                  ((identifier) @tagged (#set! role \"tag\") (#custom! @tagged 3))";
    let query = Language::new(Syntax::JavaScript).query(source).unwrap();

    assert_eq!(query.pattern_count(), 3);
    assert_eq!(query.text_predicate_count(0), 0);
    assert_eq!(query.text_predicate_count(1), 1);
    assert_eq!(query.text_predicate_count(2), 0);
    assert!(query.set_properties(1).is_empty());
    assert_eq!(
        query.set_properties(2).get("role"),
        Some(&Some("tag".to_string()))
    );

    let custom = query.predicates_for_pattern(2);
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0].operator, "custom!");
    assert_eq!(custom[0].operands[0].kind, OperandKind::Capture);
    assert_eq!(custom[0].operands[1].name, "3");
    assert_eq!(custom[0].operands[1].kind, OperandKind::String);
}

#[test]
fn predicate_results_match_across_trees() {
    let language = Language::new(Syntax::JavaScript);
    let mut query = language
        .query(r#"((identifier) @id (#not-eq? @id "skip"))"#)
        .unwrap();

    let first = parse(Syntax::JavaScript, "keep; skip;");
    let second = parse(Syntax::JavaScript, "skip; other;");

    let a = query.captures(&first.root_node(), &QueryOptions::default());
    let b = query.captures(&second.root_node(), &QueryOptions::default());
    assert_eq!(a.captures.len(), 1);
    assert_eq!(a.captures[0].node.text(), "keep");
    assert_eq!(b.captures.len(), 1);
    assert_eq!(b.captures[0].node.text(), "other");
}

#[test]
fn query_on_subtree_only_sees_subtree() {
    let tree = parse(Syntax::JavaScript, "function f() { a; }\nb;");
    let root = tree.root_node();
    let function = root.named_child(0).unwrap();
    let mut query = Language::new(Syntax::JavaScript)
        .query("(expression_statement (identifier) @id)")
        .unwrap();

    let captures = query.captures(&function, &QueryOptions::default()).captures;
    let texts: Vec<&str> = captures.iter().map(|c| c.node.text()).collect();
    assert_eq!(texts, vec!["a"]);
}

#[test]
fn point_range_on_multiline_source() {
    let tree = parse(Syntax::Go, "package p\n\nvar a = 1\nvar b = 2\nvar c = 3\n");
    let mut query = Language::new(Syntax::Go)
        .query("(var_spec name: (identifier) @name)")
        .unwrap();

    let options = QueryOptions::default()
        .with_range(QueryRange::points(Point::new(3, 0), Point::new(4, 0)));
    let names: Vec<&str> = query
        .captures(&tree.root_node(), &options)
        .captures
        .iter()
        .map(|c| c.node.text())
        .collect();
    assert_eq!(names, vec!["b"]);
}

#[test]
fn predicate_attached_to_top_level_pattern() {
    let tree = parse(Syntax::JavaScript, "x; y;");
    let mut query = Language::new(Syntax::JavaScript)
        .query("(identifier) @id (#eq? @id \"y\")")
        .unwrap();

    let captures = query
        .captures(&tree.root_node(), &QueryOptions::default())
        .captures;
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].node.text(), "y");
}

#[test]
fn construction_errors_are_typed() {
    let js = Language::new(Syntax::JavaScript);

    assert!(matches!(
        js.query("(identifer)").unwrap_err(),
        QueryError::NodeType { ref word, suggestion: Some(ref s), .. }
            if word == "identifer" && s == "identifier"
    ));
    assert!(matches!(
        js.query("((identifier) @a (#eq? @a))").unwrap_err(),
        QueryError::Arity { got: 1, .. }
    ));
    assert!(matches!(
        js.query(r#"((identifier) @a (#match? @a "["))"#).unwrap_err(),
        QueryError::InvalidRegex { .. }
    ));
    assert!(matches!(
        js.query(r#"((identifier) @a (#eq? "x" @a))"#).unwrap_err(),
        QueryError::Type { .. }
    ));
    assert!(matches!(
        js.query("((identifier) @a (#eq? @a \"x\"").unwrap_err(),
        QueryError::Syntax { .. }
    ));
}

#[test]
fn open_ended_range_runs_to_the_end() {
    let tree = parse(Syntax::Go, "package p\n\nvar a = 1\nvar b = 2\nvar c = 3\n");
    let mut query = Language::new(Syntax::Go)
        .query("(var_spec name: (identifier) @name)")
        .unwrap();

    let options = QueryOptions::default()
        .with_range(QueryRange::points(Point::new(3, 0), Point::new(0, 0)));
    let names: Vec<&str> = query
        .captures(&tree.root_node(), &options)
        .captures
        .iter()
        .map(|c| c.node.text())
        .collect();
    assert_eq!(names, vec!["b", "c"]);
}

#[test]
fn reused_query_honours_each_match_limit() {
    let source = format!("[{}];", "item, ".repeat(40));
    let tree = parse(Syntax::JavaScript, &source);
    let root = tree.root_node();
    let mut query = Language::new(Syntax::JavaScript)
        .query("(array (identifier) @pre (identifier) @post)")
        .unwrap();

    let unbounded = query.matches(&root, &QueryOptions::default());
    assert!(!unbounded.exceeded_match_limit);
    assert_eq!(unbounded.matches.len(), 40 * 39 / 2);

    let limited = query.matches(&root, &QueryOptions::default().with_match_limit(1));
    assert!(limited.exceeded_match_limit);
    assert!(limited.matches.len() < unbounded.matches.len());
    assert!(query.did_exceed_match_limit());
}

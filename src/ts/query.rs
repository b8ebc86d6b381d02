use crate::ts::errors::{context_at, word_at, QueryError};
use crate::ts::language::Language;
use crate::ts::node::Node;
use crate::ts::parser::Tree;
use crate::ts::predicate::{self, PatternPredicates, PredicateResult, Properties};
use crate::ts::search::UNBOUNDED;
use crate::ts::steps::{self, PredicateStep};
use std::fmt;
use std::sync::Arc;
use tree_sitter::{Point, QueryCursor, QueryErrorKind, StreamingIterator};

/// A captured node, named by its capture.
#[derive(Debug, Clone)]
pub struct Capture<'tree> {
    pub name: Arc<str>,
    /// Index into [`Query::capture_names`].
    pub index: u32,
    pub node: Node<'tree>,
}

/// One surviving match of a pattern.
#[derive(Debug, Clone)]
pub struct Match<'tree> {
    /// Index of the pattern in the query source.
    pub pattern: usize,
    pub captures: Vec<Capture<'tree>>,
}

/// Result of [`Query::matches`].
#[derive(Debug, Clone)]
pub struct Matches<'tree> {
    pub matches: Vec<Match<'tree>>,
    /// The engine dropped in-flight matches; results may be incomplete.
    pub exceeded_match_limit: bool,
}

/// Result of [`Query::captures`].
#[derive(Debug, Clone)]
pub struct Captures<'tree> {
    pub captures: Vec<Capture<'tree>>,
    /// The engine dropped in-flight matches; results may be incomplete.
    pub exceeded_match_limit: bool,
}

/// Restricts execution to nodes overlapping `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryRange {
    Points { start: Point, end: Point },
    Bytes { start: usize, end: usize },
}

impl QueryRange {
    pub fn points(start: Point, end: Point) -> Self {
        QueryRange::Points { start, end }
    }

    pub fn bytes(start: usize, end: usize) -> Self {
        QueryRange::Bytes { start, end }
    }

    /// A zero end (`(0,0)` or `0`) is open-ended, the same as in
    /// [`Node::descendants_of_type`]; otherwise a reversed range is clamped
    /// to an empty one at `start`.
    fn normalized(self) -> Self {
        match self {
            QueryRange::Points { start, end } => QueryRange::Points {
                start,
                end: if end == Point::new(0, 0) {
                    UNBOUNDED
                } else if (end.row, end.column) < (start.row, start.column) {
                    start
                } else {
                    end
                },
            },
            QueryRange::Bytes { start, end } => QueryRange::Bytes {
                start,
                end: match end {
                    0 => usize::MAX,
                    end => end.max(start),
                },
            },
        }
    }
}

/// Per-call execution options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// `None` searches the whole subtree.
    pub range: Option<QueryRange>,
    /// Maximum number of in-progress matches; 0 means unbounded.
    pub match_limit: u32,
}

impl QueryOptions {
    pub fn with_range(mut self, range: QueryRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_match_limit(mut self, match_limit: u32) -> Self {
        self.match_limit = match_limit;
        self
    }
}

/// A compiled structural query with its predicates.
///
/// Execution takes `&mut self` because each call records whether it hit the
/// match limit. Every call runs on a fresh engine cursor: a used cursor keeps
/// its capture buffers and no longer honours a lower limit.
pub struct Query {
    raw: tree_sitter::Query,
    language: Language,
    capture_names: Vec<Arc<str>>,
    patterns: Vec<PatternPredicates>,
    exceeded_match_limit: bool,
}

impl Query {
    /// Compile `source` against `language`.
    ///
    /// All pattern and predicate errors are reported here; execution never
    /// fails.
    pub fn new(language: &Language, source: &str) -> Result<Self, QueryError> {
        let extracted = steps::extract(source)?;
        let raw = tree_sitter::Query::new(language.raw(), &extracted.pattern_source)
            .map_err(|err| engine_error(language, source, err))?;

        let capture_names: Vec<Arc<str>> =
            raw.capture_names().iter().map(|name| Arc::from(*name)).collect();
        let pattern_count = raw.pattern_count();
        let starts: Vec<usize> = (0..pattern_count)
            .map(|i| raw.start_byte_for_pattern(i))
            .collect();

        let mut streams: Vec<Vec<PredicateStep>> = vec![Vec::new(); pattern_count];
        for predicate in extracted.predicates {
            for step in &predicate.steps {
                if let PredicateStep::Capture { name, offset } = step {
                    if !capture_names.iter().any(|c| **c == **name) {
                        return Err(QueryError::Capture {
                            word: name.clone(),
                            offset: offset + 1,
                        });
                    }
                }
            }

            let pattern = starts
                .partition_point(|&start| start <= predicate.offset)
                .checked_sub(1)
                .ok_or_else(|| QueryError::Syntax {
                    offset: predicate.offset,
                    context: context_at(source, predicate.offset),
                })?;
            streams[pattern].extend(predicate.steps);
        }

        let patterns = streams
            .iter()
            .map(|steps| predicate::compile(steps))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            target: "structural_query::query",
            syntax = ?language.syntax(),
            patterns = pattern_count,
            captures = capture_names.len(),
            text_predicates = patterns.iter().map(|p| p.text_predicates.len()).sum::<usize>(),
            "query.compiled"
        );

        Ok(Self {
            raw,
            language: language.clone(),
            capture_names,
            patterns,
            exceeded_match_limit: false,
        })
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Capture names, indexed by capture id.
    pub fn capture_names(&self) -> &[Arc<str>] {
        &self.capture_names
    }

    pub fn capture_index_for_name(&self, name: &str) -> Option<u32> {
        self.capture_names
            .iter()
            .position(|c| &**c == name)
            .map(|i| i as u32)
    }

    /// Byte offset where a pattern starts in the query source.
    pub fn start_byte_for_pattern(&self, pattern: usize) -> usize {
        self.raw.start_byte_for_pattern(pattern)
    }

    /// Predicates with operators this crate does not interpret.
    ///
    /// # Panics
    ///
    /// If `pattern` is not less than [`pattern_count`](Query::pattern_count).
    pub fn predicates_for_pattern(&self, pattern: usize) -> &[PredicateResult] {
        &self.patterns[pattern].predicates
    }

    /// Number of executable text predicates attached to a pattern.
    pub fn text_predicate_count(&self, pattern: usize) -> usize {
        self.patterns[pattern].text_predicates.len()
    }

    /// Properties recorded with `#set!`.
    pub fn set_properties(&self, pattern: usize) -> &Properties {
        &self.patterns[pattern].set_properties
    }

    /// Properties recorded with `#is?`.
    pub fn asserted_properties(&self, pattern: usize) -> &Properties {
        &self.patterns[pattern].asserted_properties
    }

    /// Properties recorded with `#is-not?`.
    pub fn refuted_properties(&self, pattern: usize) -> &Properties {
        &self.patterns[pattern].refuted_properties
    }

    /// Whether the most recent [`matches`](Query::matches) or
    /// [`captures`](Query::captures) call hit the match limit.
    pub fn did_exceed_match_limit(&self) -> bool {
        self.exceeded_match_limit
    }

    /// All matches under `root` whose text predicates hold, in engine order.
    pub fn matches<'tree>(&mut self, root: &Node<'tree>, options: &QueryOptions) -> Matches<'tree> {
        let mut cursor = cursor_for(options);
        let tree = root.tree();

        let mut raw_matches = Vec::new();
        {
            let mut it = cursor.matches(&self.raw, root.raw(), tree.source().as_bytes());
            while let Some(m) = it.next() {
                raw_matches.push(RawMatch::from(m));
            }
        }
        self.exceeded_match_limit = cursor.did_exceed_match_limit();

        let candidates = raw_matches.len();
        let matches: Vec<Match<'tree>> = raw_matches
            .into_iter()
            .filter_map(|raw| {
                let captures = self.reify(tree, &raw.captures);
                self.patterns[raw.pattern]
                    .test(&captures)
                    .then_some(Match {
                        pattern: raw.pattern,
                        captures,
                    })
            })
            .collect();

        tracing::debug!(
            target: "structural_query::query",
            candidates,
            matches = matches.len(),
            exceeded_match_limit = self.exceeded_match_limit,
            "query.matches"
        );

        Matches {
            matches,
            exceeded_match_limit: self.exceeded_match_limit,
        }
    }

    /// Every capture of every surviving match, in document order.
    ///
    /// A capture is emitted only when the whole match it belongs to passes
    /// its pattern's text predicates.
    pub fn captures<'tree>(
        &mut self,
        root: &Node<'tree>,
        options: &QueryOptions,
    ) -> Captures<'tree> {
        let mut cursor = cursor_for(options);
        let tree = root.tree();

        let mut raw_captures = Vec::new();
        {
            let mut it = cursor.captures(&self.raw, root.raw(), tree.source().as_bytes());
            while let Some((m, capture_index)) = it.next() {
                raw_captures.push((RawMatch::from(m), *capture_index));
            }
        }
        self.exceeded_match_limit = cursor.did_exceed_match_limit();

        let candidates = raw_captures.len();
        let captures: Vec<Capture<'tree>> = raw_captures
            .into_iter()
            .filter_map(|(raw, capture_index)| {
                let mut captures = self.reify(tree, &raw.captures);
                if !self.patterns[raw.pattern].test(&captures) || capture_index >= captures.len() {
                    return None;
                }
                Some(captures.swap_remove(capture_index))
            })
            .collect();

        tracing::debug!(
            target: "structural_query::query",
            candidates,
            captures = captures.len(),
            exceeded_match_limit = self.exceeded_match_limit,
            "query.captures"
        );

        Captures {
            captures,
            exceeded_match_limit: self.exceeded_match_limit,
        }
    }

    fn reify<'tree>(
        &self,
        tree: &'tree Tree,
        raw: &[(u32, tree_sitter::Node<'tree>)],
    ) -> Vec<Capture<'tree>> {
        raw.iter()
            .map(|&(index, node)| Capture {
                name: Arc::clone(&self.capture_names[index as usize]),
                index,
                node: Node::new(tree, node),
            })
            .collect()
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("language", &self.language)
            .field("patterns", &self.patterns.len())
            .field("capture_names", &self.capture_names)
            .finish()
    }
}

fn cursor_for(options: &QueryOptions) -> QueryCursor {
    let mut cursor = QueryCursor::new();
    cursor.set_match_limit(match options.match_limit {
        0 => u32::MAX,
        n => n,
    });
    match options.range.map(QueryRange::normalized) {
        Some(QueryRange::Points { start, end }) => {
            cursor.set_point_range(start..end);
        }
        Some(QueryRange::Bytes { start, end }) => {
            cursor.set_byte_range(start..end);
        }
        None => {}
    }
    cursor
}

/// A match copied out of the engine's streaming iterator.
struct RawMatch<'tree> {
    pattern: usize,
    captures: Vec<(u32, tree_sitter::Node<'tree>)>,
}

impl<'tree> From<&tree_sitter::QueryMatch<'_, 'tree>> for RawMatch<'tree> {
    fn from(m: &tree_sitter::QueryMatch<'_, 'tree>) -> Self {
        Self {
            pattern: m.pattern_index,
            captures: m.captures.iter().map(|c| (c.index, c.node)).collect(),
        }
    }
}

/// Translate an engine compile error, reading the offending word and context
/// from the caller's source.
fn engine_error(language: &Language, source: &str, err: tree_sitter::QueryError) -> QueryError {
    let offset = err.offset;
    match err.kind {
        QueryErrorKind::NodeType => {
            let word = word_at(source, offset);
            let suggestion = language.closest_node_type(&word).map(str::to_string);
            QueryError::NodeType {
                word,
                offset,
                suggestion,
            }
        }
        QueryErrorKind::Field => QueryError::Field {
            word: word_at(source, offset),
            offset,
        },
        QueryErrorKind::Capture => QueryError::Capture {
            word: word_at(source, offset),
            offset,
        },
        QueryErrorKind::Structure => QueryError::Structure {
            offset,
            context: context_at(source, offset),
        },
        QueryErrorKind::Language => QueryError::Language {
            message: err.message,
        },
        _ => QueryError::Syntax {
            offset,
            context: context_at(source, offset),
        },
    }
}

use crate::ts::language::Syntax;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while constructing a [`Query`](crate::ts::Query).
///
/// Every variant is produced eagerly by `Query::new`; nothing here is ever
/// observed while matching.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid node name '{word}'{}", did_you_mean(suggestion))]
    NodeType {
        word: String,
        offset: usize,
        suggestion: Option<String>,
    },

    #[error("invalid field name '{word}'")]
    Field { word: String, offset: usize },

    #[error("invalid capture name @{word}")]
    Capture { word: String, offset: usize },

    #[error("invalid structure at offset {offset} ('{context}')")]
    Structure { offset: usize, context: String },

    #[error("invalid syntax at offset {offset} ('{context}')")]
    Syntax { offset: usize, context: String },

    #[error("incompatible language: {message}")]
    Language { message: String },

    #[error("predicates must begin with a literal value (offset {offset})")]
    OperatorNotLiteral { offset: usize },

    #[error("wrong number of arguments to `#{operator}` predicate: expected {expected}, got {got}")]
    Arity {
        operator: String,
        expected: &'static str,
        got: usize,
        offset: usize,
    },

    #[error("{message} (`#{operator}` predicate at offset {offset})")]
    Type {
        operator: String,
        message: &'static str,
        offset: usize,
    },

    #[error("invalid regular expression {pattern:?} at offset {offset}: {source}")]
    InvalidRegex {
        pattern: String,
        offset: usize,
        #[source]
        source: regex::Error,
    },
}

impl QueryError {
    /// Byte offset in the query source the error points at, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            QueryError::NodeType { offset, .. }
            | QueryError::Field { offset, .. }
            | QueryError::Capture { offset, .. }
            | QueryError::Structure { offset, .. }
            | QueryError::Syntax { offset, .. }
            | QueryError::OperatorNotLiteral { offset }
            | QueryError::Arity { offset, .. }
            | QueryError::Type { offset, .. }
            | QueryError::InvalidRegex { offset, .. } => Some(*offset),
            QueryError::Language { .. } => None,
        }
    }

    /// The predicate operator involved, for predicate compile errors.
    pub fn operator(&self) -> Option<&str> {
        match self {
            QueryError::Arity { operator, .. } | QueryError::Type { operator, .. } => {
                Some(operator)
            }
            _ => None,
        }
    }
}

/// Up to 100 chars of `source` starting at `offset`, cut at the first newline.
pub(crate) fn context_at(source: &str, offset: usize) -> String {
    source
        .get(offset..)
        .unwrap_or("")
        .chars()
        .take(100)
        .take_while(|&c| c != '\n')
        .collect()
}

/// The word-like token (`[\w\-.]*`) starting at `offset`.
pub(crate) fn word_at(source: &str, offset: usize) -> String {
    source
        .get(offset..)
        .unwrap_or("")
        .chars()
        .take_while(|&c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect()
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum TreeSitterError {
    #[error("incompatible {syntax} grammar (ABI version {version})")]
    LanguageSet { syntax: String, version: usize },

    #[error("unknown language: {name}")]
    UnknownLanguage { name: String },

    #[error("failed to parse source code")]
    ParseFailed,

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TreeSitterError {
    pub(crate) fn language_set(syntax: Option<Syntax>, version: usize) -> Self {
        TreeSitterError::LanguageSet {
            syntax: syntax.map_or_else(|| "custom".to_string(), |s| s.to_string()),
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_message_includes_suggestion() {
        let err = QueryError::NodeType {
            word: "identifer".into(),
            offset: 1,
            suggestion: Some("identifier".into()),
        };
        assert_eq!(
            err.to_string(),
            "invalid node name 'identifer' (did you mean 'identifier'?)"
        );
        assert_eq!(err.offset(), Some(1));
    }

    #[test]
    fn arity_message_names_operator() {
        let err = QueryError::Arity {
            operator: "eq?".into(),
            expected: "2",
            got: 0,
            offset: 14,
        };
        assert_eq!(
            err.to_string(),
            "wrong number of arguments to `#eq?` predicate: expected 2, got 0"
        );
        assert_eq!(err.operator(), Some("eq?"));
    }

    #[test]
    fn context_stops_at_newline() {
        let source = "(function_declaration wat)\n(identifier)";
        assert_eq!(context_at(source, 22), "wat)");
        assert_eq!(context_at(source, 500), "");
        assert_eq!(context_at(&"x".repeat(300), 0).len(), 100);
    }

    #[test]
    fn word_is_leading_identifier_run() {
        assert_eq!(word_at("(non_existent) @a", 1), "non_existent");
        assert_eq!(word_at("(foo.bar-baz)", 1), "foo.bar-baz");
        assert_eq!(word_at("((x))", 0), "");
    }
}

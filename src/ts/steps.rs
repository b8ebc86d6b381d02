//! Predicate instruction streams.
//!
//! The engine's safe query API interprets predicates on its own and never
//! exposes them as raw steps, so predicate groups are lifted out of the query
//! source here. Each `(#op arg ...)` group becomes a flat run of
//! [`PredicateStep`]s terminated by [`PredicateStep::Done`], and its text is
//! blanked to spaces so the engine compiles only the structural patterns.
//! Blanking is byte-for-byte with newlines kept, so byte offsets, rows and
//! columns reported by the engine still refer to the text the caller wrote.

use crate::ts::errors::QueryError;

/// One token of a predicate invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateStep {
    /// `@name`; `offset` points at the `@`.
    Capture { name: String, offset: usize },
    /// Operator name, quoted string or bare word.
    String { value: String, offset: usize },
    /// End of one invocation.
    Done,
}

impl PredicateStep {
    pub fn offset(&self) -> Option<usize> {
        match self {
            PredicateStep::Capture { offset, .. } | PredicateStep::String { offset, .. } => {
                Some(*offset)
            }
            PredicateStep::Done => None,
        }
    }
}

/// A single predicate group lifted out of the query source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPredicate {
    /// Offset of the `#` that starts the operator.
    pub offset: usize,
    /// Steps including the trailing [`PredicateStep::Done`].
    pub steps: Vec<PredicateStep>,
}

/// Query source split into its structural part and its predicates.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Same length as the input, with every predicate group blanked out.
    pub pattern_source: String,
    pub predicates: Vec<RawPredicate>,
}

pub fn extract(source: &str) -> Result<Extracted, QueryError> {
    let bytes = source.as_bytes();
    let mut blanked = bytes.to_vec();
    let mut predicates = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b';' => i = skip_comment(bytes, i),
            // Unterminated strings outside predicates are left for the
            // engine to report.
            b'"' => i = scan_string(source, i).map_or(bytes.len(), |(_, end)| end),
            b'(' => {
                let hash = skip_trivia(bytes, i + 1);
                if bytes.get(hash) == Some(&b'#') {
                    let (steps, end) = parse_predicate(source, i, hash)?;
                    for b in &mut blanked[i..end] {
                        if *b != b'\n' {
                            *b = b' ';
                        }
                    }
                    predicates.push(RawPredicate {
                        offset: hash,
                        steps,
                    });
                    i = end;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    Ok(Extracted {
        // Only whole groups delimited by ASCII parens were replaced, so this
        // is always valid UTF-8.
        pattern_source: String::from_utf8_lossy(&blanked).into_owned(),
        predicates,
    })
}

fn parse_predicate(
    source: &str,
    open: usize,
    hash: usize,
) -> Result<(Vec<PredicateStep>, usize), QueryError> {
    let bytes = source.as_bytes();
    let mut steps = Vec::new();

    let name_end = scan_word(bytes, hash + 1);
    if name_end == hash + 1 {
        return Err(syntax_error(source, hash));
    }
    steps.push(PredicateStep::String {
        value: source[hash + 1..name_end].to_string(),
        offset: hash,
    });

    let mut i = name_end;
    loop {
        i = skip_trivia(bytes, i);
        match bytes.get(i) {
            None => return Err(syntax_error(source, open)),
            Some(b')') => {
                steps.push(PredicateStep::Done);
                return Ok((steps, i + 1));
            }
            Some(b'@') => {
                let end = scan_word(bytes, i + 1);
                if end == i + 1 {
                    return Err(syntax_error(source, i));
                }
                steps.push(PredicateStep::Capture {
                    name: source[i + 1..end].to_string(),
                    offset: i,
                });
                i = end;
            }
            Some(b'"') => {
                let (value, end) =
                    scan_string(source, i).ok_or_else(|| syntax_error(source, i))?;
                steps.push(PredicateStep::String { value, offset: i });
                i = end;
            }
            Some(_) => {
                let end = scan_word(bytes, i);
                if end == i {
                    return Err(syntax_error(source, i));
                }
                steps.push(PredicateStep::String {
                    value: source[i..end].to_string(),
                    offset: i,
                });
                i = end;
            }
        }
    }
}

fn syntax_error(source: &str, offset: usize) -> QueryError {
    QueryError::Syntax {
        offset,
        context: crate::ts::errors::context_at(source, offset),
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'?' | b'!') || b >= 0x80
}

/// End of the identifier-like run starting at `start`. Non-ASCII bytes count
/// as word bytes so the run always ends on a char boundary.
fn scan_word(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && is_word_byte(bytes[i]) {
        i += 1;
    }
    i
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

fn skip_trivia(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
        } else if bytes[i] == b';' {
            i = skip_comment(bytes, i);
        } else {
            break;
        }
    }
    i
}

/// Decode the string literal opening at `start`, returning its value and the
/// offset just past the closing quote.
fn scan_string(source: &str, start: usize) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = source[start + 1..].char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, start + 1 + i + 1)),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    '0' => '\0',
                    other => other,
                });
            }
            c => value.push(c),
        }
    }
    None
}

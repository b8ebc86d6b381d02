//! Predicate compiler.
//!
//! Turns a pattern's flat [`PredicateStep`] stream into executable
//! [`TextPredicate`]s, generic [`PredicateResult`] descriptors for operators
//! interpreted by callers, and the `set!` / `is?` / `is-not?` property maps.

use crate::ts::errors::QueryError;
use crate::ts::query::Capture;
use crate::ts::steps::PredicateStep;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Property name to optional value, as recorded by `set!`, `is?` and
/// `is-not?`. A later assignment to the same key overwrites.
pub type Properties = HashMap<String, Option<String>>;

/// An executable text predicate. Owns every name and literal it refers to.
#[derive(Debug, Clone)]
pub enum TextPredicate {
    /// `eq?` / `not-eq?` between two captures.
    EqCapture {
        left: String,
        right: String,
        positive: bool,
    },
    /// `eq?` / `not-eq?` between a capture and a literal.
    EqString {
        capture: String,
        value: String,
        positive: bool,
    },
    /// `match?` / `not-match?`.
    Match {
        capture: String,
        regex: Regex,
        positive: bool,
    },
}

impl TextPredicate {
    /// Whether a candidate match survives this predicate.
    ///
    /// A referenced capture that is absent from the match makes the predicate
    /// pass. When a name is captured more than once, the first occurrence is
    /// used.
    pub fn test(&self, captures: &[Capture<'_>]) -> bool {
        let text_of = |name: &str| {
            captures
                .iter()
                .find(|c| &*c.name == name)
                .map(|c| c.node.text())
        };

        match self {
            TextPredicate::EqCapture {
                left,
                right,
                positive,
            } => match (text_of(left), text_of(right)) {
                (Some(a), Some(b)) => (a == b) == *positive,
                _ => true,
            },
            TextPredicate::EqString {
                capture,
                value,
                positive,
            } => text_of(capture).map_or(true, |text| (text == value) == *positive),
            TextPredicate::Match {
                capture,
                regex,
                positive,
            } => text_of(capture).map_or(true, |text| regex.is_match(text) == *positive),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandKind {
    Capture,
    String,
}

/// One operand of a generic predicate: a capture name or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operand {
    pub name: String,
    pub kind: OperandKind,
}

/// A predicate whose operator is not interpreted here, surfaced as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredicateResult {
    pub operator: String,
    pub operands: Vec<Operand>,
}

/// Everything the predicates of one pattern compile to.
#[derive(Debug, Clone, Default)]
pub struct PatternPredicates {
    pub text_predicates: Vec<TextPredicate>,
    pub predicates: Vec<PredicateResult>,
    pub set_properties: Properties,
    pub asserted_properties: Properties,
    pub refuted_properties: Properties,
}

impl PatternPredicates {
    /// Run the text predicates in order, stopping at the first failure.
    pub fn test(&self, captures: &[Capture<'_>]) -> bool {
        self.text_predicates.iter().all(|p| p.test(captures))
    }
}

/// Compile one pattern's step stream. Steps after the last
/// [`PredicateStep::Done`] do not form an invocation and are ignored.
pub fn compile(steps: &[PredicateStep]) -> Result<PatternPredicates, QueryError> {
    let mut compiled = PatternPredicates::default();
    let mut buffer: Vec<&PredicateStep> = Vec::new();

    for step in steps {
        if let PredicateStep::Done = step {
            if !buffer.is_empty() {
                compiled.push_invocation(&buffer)?;
                buffer.clear();
            }
        } else {
            buffer.push(step);
        }
    }

    Ok(compiled)
}

impl PatternPredicates {
    fn push_invocation(&mut self, steps: &[&PredicateStep]) -> Result<(), QueryError> {
        let (operator, offset) = match steps[0] {
            PredicateStep::String { value, offset } => (value.as_str(), *offset),
            other => {
                return Err(QueryError::OperatorNotLiteral {
                    offset: other.offset().unwrap_or(0),
                })
            }
        };
        let args = &steps[1..];

        tracing::trace!(
            target: "structural_query::predicate",
            operator,
            args = args.len(),
            offset,
            "predicate.compile"
        );

        match operator {
            "eq?" | "not-eq?" => {
                let positive = operator == "eq?";
                if args.len() != 2 {
                    return Err(arity(operator, "2", args.len(), offset));
                }
                let PredicateStep::Capture { name: left, .. } = args[0] else {
                    return Err(type_error(
                        operator,
                        "first argument must be a capture",
                        offset,
                    ));
                };
                let predicate = match args[1] {
                    PredicateStep::Capture { name: right, .. } => TextPredicate::EqCapture {
                        left: left.clone(),
                        right: right.clone(),
                        positive,
                    },
                    PredicateStep::String { value, .. } => TextPredicate::EqString {
                        capture: left.clone(),
                        value: value.clone(),
                        positive,
                    },
                    PredicateStep::Done => return Err(arity(operator, "2", 1, offset)),
                };
                self.text_predicates.push(predicate);
            }

            "match?" | "not-match?" => {
                let positive = operator == "match?";
                if args.len() != 2 {
                    return Err(arity(operator, "2", args.len(), offset));
                }
                let PredicateStep::Capture { name: capture, .. } = args[0] else {
                    return Err(type_error(
                        operator,
                        "first argument must be a capture",
                        offset,
                    ));
                };
                let PredicateStep::String { value: pattern, .. } = args[1] else {
                    return Err(type_error(
                        operator,
                        "second argument must be a string",
                        offset,
                    ));
                };
                let regex = Regex::new(pattern).map_err(|source| QueryError::InvalidRegex {
                    pattern: pattern.clone(),
                    offset,
                    source,
                })?;
                self.text_predicates.push(TextPredicate::Match {
                    capture: capture.clone(),
                    regex,
                    positive,
                });
            }

            "set!" => {
                let (key, value) = property(operator, args, offset)?;
                self.set_properties.insert(key, value);
            }
            "is?" => {
                let (key, value) = property(operator, args, offset)?;
                self.asserted_properties.insert(key, value);
            }
            "is-not?" => {
                let (key, value) = property(operator, args, offset)?;
                self.refuted_properties.insert(key, value);
            }

            _ => {
                let operands = args
                    .iter()
                    .filter_map(|step| match step {
                        PredicateStep::Capture { name, .. } => Some(Operand {
                            name: name.clone(),
                            kind: OperandKind::Capture,
                        }),
                        PredicateStep::String { value, .. } => Some(Operand {
                            name: value.clone(),
                            kind: OperandKind::String,
                        }),
                        PredicateStep::Done => None,
                    })
                    .collect();
                self.predicates.push(PredicateResult {
                    operator: operator.to_string(),
                    operands,
                });
            }
        }

        Ok(())
    }
}

/// Key and optional value of a property directive; every argument must be a
/// literal.
fn property(
    operator: &str,
    args: &[&PredicateStep],
    offset: usize,
) -> Result<(String, Option<String>), QueryError> {
    if args.is_empty() || args.len() > 2 {
        return Err(arity(operator, "1 or 2", args.len(), offset));
    }
    let mut literals = args.iter().map(|step| match step {
        PredicateStep::String { value, .. } => Some(value.clone()),
        _ => None,
    });
    let key = literals.next().flatten();
    let value = literals.next();
    match (key, value) {
        (Some(key), None) => Ok((key, None)),
        (Some(key), Some(Some(value))) => Ok((key, Some(value))),
        _ => Err(type_error(operator, "arguments must be strings", offset)),
    }
}

fn arity(operator: &str, expected: &'static str, got: usize, offset: usize) -> QueryError {
    QueryError::Arity {
        operator: operator.to_string(),
        expected,
        got,
        offset,
    }
}

fn type_error(operator: &str, message: &'static str, offset: usize) -> QueryError {
    QueryError::Type {
        operator: operator.to_string(),
        message,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(name: &str) -> PredicateStep {
        PredicateStep::String {
            value: name.to_string(),
            offset: 7,
        }
    }

    fn cap(name: &str) -> PredicateStep {
        PredicateStep::Capture {
            name: name.to_string(),
            offset: 0,
        }
    }

    fn lit(value: &str) -> PredicateStep {
        PredicateStep::String {
            value: value.to_string(),
            offset: 0,
        }
    }

    #[test]
    fn compiles_text_predicates_in_order() {
        let compiled = compile(&[
            op("eq?"),
            cap("a"),
            cap("b"),
            PredicateStep::Done,
            op("not-match?"),
            cap("a"),
            lit("^_"),
            PredicateStep::Done,
        ])
        .unwrap();

        assert_eq!(compiled.text_predicates.len(), 2);
        assert!(matches!(
            compiled.text_predicates[0],
            TextPredicate::EqCapture { positive: true, .. }
        ));
        assert!(matches!(
            compiled.text_predicates[1],
            TextPredicate::Match { positive: false, .. }
        ));
        assert!(compiled.predicates.is_empty());
    }

    #[test]
    fn operator_must_be_literal() {
        let err = compile(&[
            PredicateStep::Capture {
                name: "a".into(),
                offset: 3,
            },
            PredicateStep::Done,
        ])
        .unwrap_err();
        assert!(matches!(err, QueryError::OperatorNotLiteral { offset: 3 }));
    }

    #[test]
    fn eq_arity_and_type() {
        let err = compile(&[op("eq?"), PredicateStep::Done]).unwrap_err();
        assert!(matches!(
            &err,
            QueryError::Arity { operator, got: 0, offset: 7, .. } if operator == "eq?"
        ));

        let err = compile(&[op("eq?"), cap("a"), lit("x"), lit("y"), PredicateStep::Done])
            .unwrap_err();
        assert!(matches!(err, QueryError::Arity { got: 3, .. }));

        let err = compile(&[op("not-eq?"), lit("x"), cap("a"), PredicateStep::Done]).unwrap_err();
        assert!(matches!(
            &err,
            QueryError::Type { operator, .. } if operator == "not-eq?"
        ));
    }

    #[test]
    fn match_requires_string_pattern_and_valid_regex() {
        let err = compile(&[op("match?"), cap("a"), cap("b"), PredicateStep::Done]).unwrap_err();
        assert!(matches!(err, QueryError::Type { .. }));

        let err = compile(&[op("match?"), cap("a"), lit("("), PredicateStep::Done]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidRegex { offset: 7, .. }));
    }

    #[test]
    fn records_properties() {
        let compiled = compile(&[
            op("set!"),
            lit("injection.language"),
            lit("js"),
            PredicateStep::Done,
            op("set!"),
            lit("local"),
            PredicateStep::Done,
            op("is?"),
            lit("local"),
            PredicateStep::Done,
            op("is-not?"),
            lit("global"),
            lit("yes"),
            PredicateStep::Done,
            op("set!"),
            lit("injection.language"),
            lit("ts"),
            PredicateStep::Done,
        ])
        .unwrap();

        assert_eq!(
            compiled.set_properties.get("injection.language"),
            Some(&Some("ts".to_string()))
        );
        assert_eq!(compiled.set_properties.get("local"), Some(&None));
        assert_eq!(compiled.asserted_properties.get("local"), Some(&None));
        assert_eq!(
            compiled.refuted_properties.get("global"),
            Some(&Some("yes".to_string()))
        );
        assert!(compiled.text_predicates.is_empty());
    }

    #[test]
    fn property_arguments_are_checked() {
        let err = compile(&[op("set!"), PredicateStep::Done]).unwrap_err();
        assert!(matches!(err, QueryError::Arity { got: 0, .. }));

        let err = compile(&[op("is?"), lit("a"), lit("b"), lit("c"), PredicateStep::Done])
            .unwrap_err();
        assert!(matches!(err, QueryError::Arity { got: 3, .. }));

        let err = compile(&[op("is-not?"), cap("a"), PredicateStep::Done]).unwrap_err();
        assert!(matches!(
            &err,
            QueryError::Type { operator, .. } if operator == "is-not?"
        ));

        let err = compile(&[op("set!"), lit("a"), cap("b"), PredicateStep::Done]).unwrap_err();
        assert!(matches!(err, QueryError::Type { .. }));
    }

    #[test]
    fn unknown_operator_becomes_descriptor() {
        let compiled = compile(&[op("foo?"), cap("a"), lit("b"), PredicateStep::Done]).unwrap();

        assert!(compiled.text_predicates.is_empty());
        assert_eq!(
            compiled.predicates,
            vec![PredicateResult {
                operator: "foo?".into(),
                operands: vec![
                    Operand {
                        name: "a".into(),
                        kind: OperandKind::Capture
                    },
                    Operand {
                        name: "b".into(),
                        kind: OperandKind::String
                    },
                ],
            }]
        );
    }

    #[test]
    fn empty_stream_and_trailing_steps() {
        let compiled = compile(&[]).unwrap();
        assert!(compiled.text_predicates.is_empty());

        let compiled = compile(&[PredicateStep::Done, op("eq?")]).unwrap();
        assert!(compiled.text_predicates.is_empty());
    }
}

use crate::ts::Syntax;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// A named set of queries and searches over one language.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct QueryConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub queries: Vec<QueryDefinition>,
    #[serde(default)]
    pub searches: Vec<SearchDefinition>,
}

impl QueryConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.meta.language.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                entry: None,
                field: "meta.language",
            });
        } else if Syntax::parse(&self.meta.language).is_none() {
            issues.push(ValidationIssue::UnknownLanguage {
                name: self.meta.language.clone(),
            });
        }

        if self.queries.is_empty() && self.searches.is_empty() {
            issues.push(ValidationIssue::EmptyConfig);
        }

        let mut seen = HashSet::new();
        let names = self
            .queries
            .iter()
            .map(|q| q.name.as_str())
            .chain(self.searches.iter().map(|s| s.name.as_str()));
        for name in names {
            if name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry: None,
                    field: "name",
                });
            } else if !seen.insert(name) {
                issues.push(ValidationIssue::DuplicateName {
                    name: name.to_string(),
                });
            }
        }

        for query in &self.queries {
            if query.pattern.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry: Some(query.name.clone()),
                    field: "pattern",
                });
            }
        }

        for search in &self.searches {
            if search.types.is_empty() || search.types.iter().any(|t| t.trim().is_empty()) {
                issues.push(ValidationIssue::MissingField {
                    entry: Some(search.name.clone()),
                    field: "types",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// The configured syntax. Only meaningful after [`validate`](Self::validate)
    /// has succeeded.
    pub fn syntax(&self) -> Option<Syntax> {
        Syntax::parse(&self.meta.language)
    }

    /// Effective match limit for a query: its own, else the file default.
    pub fn match_limit_for(&self, query: &QueryDefinition) -> u32 {
        query.match_limit.unwrap_or(self.meta.match_limit)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Default for every query; 0 means unbounded.
    #[serde(default)]
    pub match_limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryDefinition {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub match_limit: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Matches,
    Captures,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchDefinition {
    pub name: String,
    pub types: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyConfig,
    UnknownLanguage {
        name: String,
    },
    DuplicateName {
        name: String,
    },
    MissingField {
        entry: Option<String>,
        field: &'static str,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyConfig => {
                write!(f, "defines no queries or searches")
            }
            ValidationIssue::UnknownLanguage { name } => write!(f, "unknown language '{name}'"),
            ValidationIssue::DuplicateName { name } => {
                write!(f, "name '{name}' is used more than once")
            }
            ValidationIssue::MissingField { entry, field } => match entry {
                Some(name) => write!(f, "'{name}' missing required field '{field}'"),
                None => write!(f, "missing required field '{field}'"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(name: &str, pattern: &str) -> QueryDefinition {
        QueryDefinition {
            name: name.to_string(),
            pattern: pattern.to_string(),
            mode: Mode::Matches,
            match_limit: None,
        }
    }

    #[test]
    fn collects_every_issue() {
        let config = QueryConfig {
            meta: Metadata {
                language: "cobol".into(),
                ..Metadata::default()
            },
            queries: vec![query("a", ""), query("a", "(identifier) @id")],
            searches: vec![SearchDefinition {
                name: "s".into(),
                types: vec![],
            }],
        };

        let issues = config.validate().unwrap_err().issues;
        assert_eq!(
            issues,
            vec![
                ValidationIssue::UnknownLanguage {
                    name: "cobol".into()
                },
                ValidationIssue::DuplicateName { name: "a".into() },
                ValidationIssue::MissingField {
                    entry: Some("a".into()),
                    field: "pattern"
                },
                ValidationIssue::MissingField {
                    entry: Some("s".into()),
                    field: "types"
                },
            ]
        );
    }

    #[test]
    fn empty_config_is_rejected() {
        let issues = QueryConfig::default().validate().unwrap_err().issues;
        assert!(issues.contains(&ValidationIssue::EmptyConfig));
        assert!(issues.contains(&ValidationIssue::MissingField {
            entry: None,
            field: "meta.language"
        }));
    }

    #[test]
    fn per_query_limit_overrides_default() {
        let mut config = QueryConfig {
            meta: Metadata {
                language: "js".into(),
                match_limit: 8,
                ..Metadata::default()
            },
            queries: vec![query("a", "(identifier) @id")],
            searches: vec![],
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.syntax(), Some(Syntax::JavaScript));
        assert_eq!(config.match_limit_for(&config.queries[0]), 8);

        config.queries[0].match_limit = Some(2);
        assert_eq!(config.match_limit_for(&config.queries[0]), 2);
    }
}

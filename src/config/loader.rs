use crate::config::schema::{QueryConfig, ValidationError, ValidationIssue};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where a query set came from, for error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Origin {
    #[default]
    Inline,
    File(PathBuf),
}

impl Origin {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Origin::Inline => None,
            Origin::File(path) => Some(path),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Inline => f.write_str("<inline>"),
            Origin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read query set {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("query set {origin} is not valid TOML: {source}")]
    Syntax {
        origin: Origin,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("query set {origin} has {} problem(s):\n{source}", .source.issues.len())]
    Invalid {
        origin: Origin,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn origin(&self) -> Origin {
        match self {
            ConfigError::Read { path, .. } => Origin::File(path.clone()),
            ConfigError::Syntax { origin, .. } | ConfigError::Invalid { origin, .. } => {
                origin.clone()
            }
        }
    }

    /// Validation issues, empty unless the set parsed but failed validation.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ConfigError::Invalid { source, .. } => &source.issues,
            _ => &[],
        }
    }
}

/// Parse and validate a query set held in memory.
pub fn load_from_str(input: &str) -> Result<QueryConfig, ConfigError> {
    load(input, Origin::Inline)
}

/// Read, parse and validate the query set at `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<QueryConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load(&contents, Origin::File(path.to_path_buf()))
}

fn load(input: &str, origin: Origin) -> Result<QueryConfig, ConfigError> {
    let config: QueryConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Syntax { origin, source }),
    };
    if let Err(source) = config.validate() {
        return Err(ConfigError::Invalid { origin, source });
    }

    tracing::debug!(
        target: "structural_query::config",
        %origin,
        language = %config.meta.language,
        queries = config.queries.len(),
        searches = config.searches.len(),
        "config.loaded"
    );
    Ok(config)
}

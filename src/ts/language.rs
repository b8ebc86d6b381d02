//! Symbol and field catalog for a tree-sitter grammar.
//!
//! Node types and fields are stored in id-indexed tables built once per
//! language, so id -> name lookups never touch the engine and name -> id
//! lookups scan a small dense vector.

use crate::ts::errors::{QueryError, TreeSitterError};
use crate::ts::query::Query;
use ast_grep_language::{LanguageExt, SupportLang};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Built-in grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    C,
    Cpp,
    CSharp,
    Go,
    Java,
    JavaScript,
    Python,
    Rust,
    TypeScript,
    Tsx,
}

impl Syntax {
    pub const ALL: [Syntax; 10] = [
        Syntax::C,
        Syntax::Cpp,
        Syntax::CSharp,
        Syntax::Go,
        Syntax::Java,
        Syntax::JavaScript,
        Syntax::Python,
        Syntax::Rust,
        Syntax::TypeScript,
        Syntax::Tsx,
    ];

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Syntax::C => "c",
            Syntax::Cpp => "cpp",
            Syntax::CSharp => "c_sharp",
            Syntax::Go => "go",
            Syntax::Java => "java",
            Syntax::JavaScript => "javascript",
            Syntax::Python => "python",
            Syntax::Rust => "rust",
            Syntax::TypeScript => "typescript",
            Syntax::Tsx => "tsx",
        }
    }

    /// Parse a canonical name or a common alias (`js`, `c++`, `rs`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        let syntax = match s.to_ascii_lowercase().as_str() {
            "c" => Syntax::C,
            "cpp" | "c++" | "cxx" => Syntax::Cpp,
            "c_sharp" | "csharp" | "c#" | "cs" => Syntax::CSharp,
            "go" | "golang" => Syntax::Go,
            "java" => Syntax::Java,
            "javascript" | "js" | "jsx" => Syntax::JavaScript,
            "python" | "py" => Syntax::Python,
            "rust" | "rs" => Syntax::Rust,
            "typescript" | "ts" => Syntax::TypeScript,
            "tsx" => Syntax::Tsx,
            _ => return None,
        };
        Some(syntax)
    }

    /// File extensions (without the dot) handled by this grammar.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Syntax::C => &["c", "h"],
            Syntax::Cpp => &["cc", "cpp", "cxx", "hpp", "hh", "hxx"],
            Syntax::CSharp => &["cs"],
            Syntax::Go => &["go"],
            Syntax::Java => &["java"],
            Syntax::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Syntax::Python => &["py", "pyi"],
            Syntax::Rust => &["rs"],
            Syntax::TypeScript => &["ts", "mts", "cts"],
            Syntax::Tsx => &["tsx"],
        }
    }

    fn support_lang(self) -> SupportLang {
        match self {
            Syntax::C => SupportLang::C,
            Syntax::Cpp => SupportLang::Cpp,
            Syntax::CSharp => SupportLang::CSharp,
            Syntax::Go => SupportLang::Go,
            Syntax::Java => SupportLang::Java,
            Syntax::JavaScript => SupportLang::JavaScript,
            Syntax::Python => SupportLang::Python,
            Syntax::Rust => SupportLang::Rust,
            Syntax::TypeScript => SupportLang::TypeScript,
            Syntax::Tsx => SupportLang::Tsx,
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Syntax {
    type Err = TreeSitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Syntax::parse(s).ok_or_else(|| TreeSitterError::UnknownLanguage {
            name: s.to_string(),
        })
    }
}

struct Catalog {
    raw: tree_sitter::Language,
    syntax: Option<Syntax>,
    /// Indexed by symbol id; `None` for hidden/auxiliary symbols.
    node_types: Vec<Option<&'static str>>,
    /// Indexed by field id; slot 0 is never a field.
    fields: Vec<Option<&'static str>>,
}

/// A grammar plus its symbol/field catalog. Cheap to clone.
#[derive(Clone)]
pub struct Language {
    catalog: Arc<Catalog>,
}

impl Language {
    pub fn new(syntax: Syntax) -> Self {
        Self::build(syntax.support_lang().get_ts_language(), Some(syntax))
    }

    /// Wrap a grammar that is not one of the built-in syntaxes.
    pub fn from_raw(raw: tree_sitter::Language) -> Self {
        Self::build(raw, None)
    }

    fn build(raw: tree_sitter::Language, syntax: Option<Syntax>) -> Self {
        let symbol_count = raw.node_kind_count();
        let node_types = (0..symbol_count)
            .map(|id| {
                let id = id as u16;
                if raw.node_kind_is_visible(id) {
                    raw.node_kind_for_id(id)
                } else {
                    None
                }
            })
            .collect();

        let field_count = raw.field_count();
        let fields = (0..=field_count)
            .map(|id| raw.field_name_for_id(id as u16))
            .collect();

        tracing::trace!(
            target: "structural_query::language",
            syntax = ?syntax,
            symbols = symbol_count,
            fields = field_count,
            "catalog.built"
        );

        Self {
            catalog: Arc::new(Catalog {
                raw,
                syntax,
                node_types,
                fields,
            }),
        }
    }

    /// The built-in syntax this language was created from, if any.
    pub fn syntax(&self) -> Option<Syntax> {
        self.catalog.syntax
    }

    pub fn raw(&self) -> &tree_sitter::Language {
        &self.catalog.raw
    }

    /// Grammar ABI version.
    pub fn version(&self) -> usize {
        self.catalog.raw.abi_version()
    }

    pub fn field_count(&self) -> usize {
        self.catalog.fields.len().saturating_sub(1)
    }

    /// All field names, in id order.
    pub fn fields(&self) -> Vec<&'static str> {
        self.catalog.fields.iter().flatten().copied().collect()
    }

    pub fn node_type_count(&self) -> usize {
        self.catalog.node_types.len()
    }

    /// All visible node type names, in id order. Names may repeat when a
    /// grammar has both a named and an anonymous symbol with the same text.
    pub fn node_types(&self) -> Vec<&'static str> {
        self.catalog.node_types.iter().flatten().copied().collect()
    }

    pub fn has_field_id(&self, field_id: u16) -> bool {
        matches!(self.catalog.fields.get(field_id as usize), Some(Some(_)))
    }

    pub fn has_field_name(&self, field_name: &str) -> bool {
        self.field_id_for_name(field_name).is_some()
    }

    /// Field name for an id, or `""` when the id is not a field.
    pub fn field_name_for_id(&self, field_id: u16) -> &'static str {
        self.catalog
            .fields
            .get(field_id as usize)
            .copied()
            .flatten()
            .unwrap_or("")
    }

    pub fn field_id_for_name(&self, field_name: &str) -> Option<u16> {
        self.catalog
            .fields
            .iter()
            .position(|f| *f == Some(field_name))
            .map(|id| id as u16)
    }

    /// Symbol id for a node type name; 0 when the name is unknown.
    pub fn id_for_node_type(&self, node_type: &str, named: bool) -> u16 {
        self.catalog.raw.id_for_node_kind(node_type, named)
    }

    /// Node type name for a symbol id; `"ERROR"` when the id is unknown.
    pub fn node_type_for_id(&self, type_id: u16) -> &'static str {
        self.catalog.raw.node_kind_for_id(type_id).unwrap_or("ERROR")
    }

    pub fn node_type_is_named(&self, type_id: u16) -> bool {
        (type_id as usize) < self.node_type_count() && self.catalog.raw.node_kind_is_named(type_id)
    }

    pub fn node_type_is_visible(&self, type_id: u16) -> bool {
        matches!(self.catalog.node_types.get(type_id as usize), Some(Some(_)))
    }

    /// Resolve node type names to every visible symbol id carrying that name.
    /// Unknown names contribute nothing.
    pub fn symbols_for_names<S: AsRef<str>>(&self, names: &[S]) -> HashSet<u16> {
        self.catalog
            .node_types
            .iter()
            .enumerate()
            .filter_map(|(id, name)| {
                let name = (*name)?;
                names
                    .iter()
                    .any(|n| n.as_ref() == name)
                    .then_some(id as u16)
            })
            .collect()
    }

    /// Closest known named node type, for "did you mean" hints.
    pub fn closest_node_type(&self, word: &str) -> Option<&'static str> {
        if word.is_empty() {
            return None;
        }
        self.catalog
            .node_types
            .iter()
            .enumerate()
            .filter_map(|(id, name)| {
                let name = (*name)?;
                self.catalog.raw.node_kind_is_named(id as u16).then_some(name)
            })
            .map(|name| (name, strsim::jaro_winkler(word, name)))
            .filter(|(_, score)| *score >= 0.85)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name)
    }

    /// Compile a query against this language.
    pub fn query(&self, source: &str) -> Result<Query, QueryError> {
        Query::new(self, source)
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("syntax", &self.catalog.syntax)
            .field("version", &self.version())
            .field("node_types", &self.node_type_count())
            .field("fields", &self.field_count())
            .finish()
    }
}

impl From<Syntax> for Language {
    fn from(syntax: Syntax) -> Self {
        Language::new(syntax)
    }
}

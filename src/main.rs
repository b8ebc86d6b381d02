use anyhow::{Context, Result};
use clap::{Args, Parser as ClapParser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use structural_query::config::{load_from_path, Mode};
use structural_query::ts::{
    Capture, Language, Node, Parser, Point, Query, QueryOptions, QueryRange, Syntax,
};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(ClapParser)]
#[command(name = "squery")]
#[command(about = "Structural tree-sitter queries over source files", long_about = None)]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace, -vvv engine trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every match of a query
    Matches(QueryArgs),

    /// Print every capture of a query, in document order
    Captures(QueryArgs),

    /// Print nodes of the given types
    Descendants {
        #[arg(short, long)]
        lang: Syntax,

        /// Node type to look for (repeatable)
        #[arg(short = 't', long = "type", required = true)]
        types: Vec<String>,

        /// Files or directories to search
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only nodes overlapping ROW:COL-ROW:COL (0-based; an end of 0:0 is open)
        #[arg(long, value_parser = parse_range)]
        range: Option<PointRange>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run every query and search of a TOML query set
    Run {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Dump the node types (and optionally fields) of a grammar
    Kinds {
        #[arg(short, long)]
        lang: Syntax,

        /// List field names instead of node types
        #[arg(long)]
        fields: bool,
    },

    /// List supported languages
    Languages,
}

#[derive(Args)]
struct QueryArgs {
    #[arg(short, long)]
    lang: Syntax,

    /// Query source, or @FILE to read it from a file
    #[arg(short, long)]
    query: String,

    /// Files or directories to search
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Only nodes overlapping ROW:COL-ROW:COL (0-based; an end of 0:0 is open)
    #[arg(long, value_parser = parse_range)]
    range: Option<PointRange>,

    /// Maximum number of in-progress matches (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    match_limit: u32,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Matches(args) => cmd_query(args, Mode::Matches, cli.verbose),
        Commands::Captures(args) => cmd_query(args, Mode::Captures, cli.verbose),
        Commands::Descendants {
            lang,
            types,
            paths,
            range,
            json,
        } => cmd_descendants(lang, &types, &paths, range, json, cli.verbose),
        Commands::Run {
            config,
            paths,
            json,
        } => cmd_run(&config, &paths, json, cli.verbose),
        Commands::Kinds { lang, fields } => cmd_kinds(lang, fields),
        Commands::Languages => cmd_languages(),
    }
}

/// `SQUERY_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "structural_query=debug",
        _ => "structural_query=trace",
    };
    let filter = EnvFilter::try_from_env("SQUERY_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PointRange {
    start: Point,
    end: Point,
}

/// Parse `ROW:COL-ROW:COL`.
fn parse_range(s: &str) -> Result<PointRange, String> {
    let point = |p: &str| -> Result<Point, String> {
        let (row, column) = p
            .split_once(':')
            .ok_or_else(|| format!("expected ROW:COL, got '{p}'"))?;
        let row = row.trim().parse().map_err(|e| format!("bad row '{row}': {e}"))?;
        let column = column
            .trim()
            .parse()
            .map_err(|e| format!("bad column '{column}': {e}"))?;
        Ok(Point::new(row, column))
    };
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected ROW:COL-ROW:COL, got '{s}'"))?;
    Ok(PointRange {
        start: point(start)?,
        end: point(end)?,
    })
}

fn new_parser(syntax: Syntax, verbose: u8) -> Result<Parser> {
    let parser = Parser::new(syntax)?;
    Ok(if verbose >= 3 {
        parser.with_trace_logging()
    } else {
        parser
    })
}

fn read_query_source(query: &str) -> Result<String> {
    match query.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read query file {path}")),
        None => Ok(query.to_string()),
    }
}

/// Explicit files are taken as-is; directories are walked for files with
/// one of the syntax's extensions.
fn collect_files(paths: &[PathBuf], syntax: Syntax) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.exists() {
            anyhow::bail!("path does not exist: {}", path.display());
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            let matches_syntax = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| syntax.extensions().contains(&ext));
            if entry.file_type().is_file() && matches_syntax {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn warn_match_limit(path: &Path, entry: Option<&str>) {
    let label = entry.map(|e| format!(" ({e})")).unwrap_or_default();
    eprintln!(
        "{}",
        format!(
            "warning: match limit exceeded in {}{label}; results may be incomplete",
            path.display()
        )
        .yellow()
    );
}

#[derive(Serialize)]
struct Position {
    row: usize,
    column: usize,
}

impl From<Point> for Position {
    fn from(p: Point) -> Self {
        Position {
            row: p.row,
            column: p.column,
        }
    }
}

#[derive(Serialize)]
struct NodeRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    capture: Option<String>,
    kind: String,
    text: String,
    start: Position,
    end: Position,
}

impl NodeRecord {
    fn new(node: &Node<'_>, capture: Option<&str>) -> Self {
        NodeRecord {
            capture: capture.map(str::to_string),
            kind: node.kind().to_string(),
            text: node.text().to_string(),
            start: node.start_position().into(),
            end: node.end_position().into(),
        }
    }

    fn from_capture(capture: &Capture<'_>) -> Self {
        Self::new(&capture.node, Some(&*capture.name))
    }
}

#[derive(Serialize)]
struct Record {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<usize>,
    nodes: Vec<NodeRecord>,
}

/// Prints records as text right away, or collects them for one JSON array.
struct Reporter {
    json: bool,
    records: Vec<Record>,
}

impl Reporter {
    fn new(json: bool) -> Self {
        Reporter {
            json,
            records: Vec::new(),
        }
    }

    fn emit(&mut self, record: Record) {
        if self.json {
            self.records.push(record);
            return;
        }

        let entry = record
            .entry
            .as_deref()
            .map(|e| format!("[{e}] ").cyan().to_string())
            .unwrap_or_default();
        let pattern = record
            .pattern
            .map(|p| format!("pattern {p}").dimmed().to_string())
            .unwrap_or_default();
        if record.pattern.is_some() {
            println!("{}{}: {}", entry, record.file.bold(), pattern);
        }
        for node in &record.nodes {
            let indent = if record.pattern.is_some() { "  " } else { "" };
            let prefix = if record.pattern.is_some() {
                String::new()
            } else {
                format!("{}{}:", entry, record.file.bold())
            };
            let name = node
                .capture
                .as_deref()
                .map(|c| format!("@{c} ").green().to_string())
                .unwrap_or_default();
            println!(
                "{indent}{prefix}{}:{} {name}{} {}",
                node.start.row + 1,
                node.start.column + 1,
                node.kind.blue(),
                first_line(&node.text)
            );
        }
    }

    fn finish(self) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(&self.records)?);
        }
        Ok(())
    }
}

fn first_line(text: &str) -> String {
    match text.split_once('\n') {
        Some((line, _)) => format!("{line}…"),
        None => text.to_string(),
    }
}

fn run_query(
    query: &mut Query,
    mode: Mode,
    root: &Node<'_>,
    options: &QueryOptions,
    file: &Path,
    entry: Option<&str>,
    reporter: &mut Reporter,
) {
    let file_name = file.display().to_string();
    let exceeded = match mode {
        Mode::Matches => {
            let result = query.matches(root, options);
            for m in &result.matches {
                reporter.emit(Record {
                    file: file_name.clone(),
                    entry: entry.map(str::to_string),
                    pattern: Some(m.pattern),
                    nodes: m.captures.iter().map(NodeRecord::from_capture).collect(),
                });
            }
            result.exceeded_match_limit
        }
        Mode::Captures => {
            let result = query.captures(root, options);
            for capture in &result.captures {
                reporter.emit(Record {
                    file: file_name.clone(),
                    entry: entry.map(str::to_string),
                    pattern: None,
                    nodes: vec![NodeRecord::from_capture(capture)],
                });
            }
            result.exceeded_match_limit
        }
    };
    if exceeded {
        warn_match_limit(file, entry);
    }
}

fn run_search<S: AsRef<str>>(
    root: &Node<'_>,
    types: &[S],
    range: Option<PointRange>,
    file: &Path,
    entry: Option<&str>,
    reporter: &mut Reporter,
) {
    let (start, end) = range.map_or_else(Default::default, |r| (r.start, r.end));
    for node in root.descendants_of_type(types, start, end) {
        reporter.emit(Record {
            file: file.display().to_string(),
            entry: entry.map(str::to_string),
            pattern: None,
            nodes: vec![NodeRecord::new(&node, None)],
        });
    }
}

fn cmd_query(args: QueryArgs, mode: Mode, verbose: u8) -> Result<()> {
    let source = read_query_source(&args.query)?;
    let language = Language::new(args.lang);
    let mut query = language.query(&source).context("failed to compile query")?;
    let options = QueryOptions {
        range: args.range.map(|r| QueryRange::points(r.start, r.end)),
        match_limit: args.match_limit,
    };

    let mut parser = new_parser(args.lang, verbose)?;
    let mut reporter = Reporter::new(args.json);
    for file in collect_files(&args.paths, args.lang)? {
        let tree = parser.parse(read_source(&file)?)?;
        run_query(
            &mut query,
            mode,
            &tree.root_node(),
            &options,
            &file,
            None,
            &mut reporter,
        );
    }
    reporter.finish()
}

fn cmd_descendants(
    lang: Syntax,
    types: &[String],
    paths: &[PathBuf],
    range: Option<PointRange>,
    json: bool,
    verbose: u8,
) -> Result<()> {
    let language = Language::new(lang);
    for unknown in types
        .iter()
        .filter(|t| language.symbols_for_names(&[t.as_str()]).is_empty())
    {
        eprintln!(
            "{}",
            format!("warning: '{unknown}' is not a node type of {lang}").yellow()
        );
    }

    let mut parser = new_parser(lang, verbose)?;
    let mut reporter = Reporter::new(json);
    for file in collect_files(paths, lang)? {
        let tree = parser.parse(read_source(&file)?)?;
        run_search(&tree.root_node(), types, range, &file, None, &mut reporter);
    }
    reporter.finish()
}

fn cmd_run(config_path: &Path, paths: &[PathBuf], json: bool, verbose: u8) -> Result<()> {
    let config = load_from_path(config_path)?;
    let syntax = config
        .syntax()
        .with_context(|| format!("unknown language '{}'", config.meta.language))?;
    let language = Language::new(syntax);

    let mut queries = Vec::with_capacity(config.queries.len());
    for definition in &config.queries {
        let query = language
            .query(&definition.pattern)
            .with_context(|| format!("failed to compile query '{}'", definition.name))?;
        let options = QueryOptions::default().with_match_limit(config.match_limit_for(definition));
        queries.push((definition, query, options));
    }

    let mut parser = new_parser(syntax, verbose)?;
    let mut reporter = Reporter::new(json);
    for file in collect_files(paths, syntax)? {
        let tree = parser.parse(read_source(&file)?)?;
        let root = tree.root_node();
        for (definition, query, options) in &mut queries {
            run_query(
                query,
                definition.mode,
                &root,
                options,
                &file,
                Some(definition.name.as_str()),
                &mut reporter,
            );
        }
        for search in &config.searches {
            run_search(
                &root,
                &search.types,
                None,
                &file,
                Some(search.name.as_str()),
                &mut reporter,
            );
        }
    }
    reporter.finish()
}

fn cmd_kinds(lang: Syntax, fields: bool) -> Result<()> {
    let language = Language::new(lang);
    if fields {
        for (id, name) in (1..=language.field_count() as u16)
            .filter(|&id| language.has_field_id(id))
            .map(|id| (id, language.field_name_for_id(id)))
        {
            println!("{:>4} {}", id.to_string().dimmed(), name);
        }
        return Ok(());
    }

    for id in 0..language.node_type_count() as u16 {
        if !language.node_type_is_visible(id) {
            continue;
        }
        let name = language.node_type_for_id(id);
        if language.node_type_is_named(id) {
            println!("{:>4} {}", id.to_string().dimmed(), name.blue());
        } else {
            println!("{:>4} {:?}", id.to_string().dimmed(), name);
        }
    }
    Ok(())
}

fn cmd_languages() -> Result<()> {
    for syntax in Syntax::ALL {
        println!(
            "{:<12} {}",
            syntax.name().bold(),
            syntax.extensions().join(", ").dimmed()
        );
    }
    Ok(())
}

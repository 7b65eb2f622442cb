//! TL;DRx - fast command reference lookup for the terminal
//!
//! Searches a static catalog of shell/CLI commands (name, description,
//! platform, category, examples, related commands) with a two-tier ranking:
//! exact/prefix boosts on the command name layered over a character
//! subsequence fuzzy scorer, combined with platform/category facet filters.
//!
//! # Input
//! A query and optional facet selections via CLI arguments; the catalog is
//! embedded in the binary and can be overridden by a user file under the
//! config directory or `--catalog`.
//!
//! # Output
//! Ranked matches rendered to stdout (colored text, or JSON with `--json`)
//!
//! # Performance
//! - Single synchronous pass over the catalog per invocation
//! - O(n*m) scoring where n=commands, m=target string length

use clap::Parser;
use colored::Colorize;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Catalog embedded at build time, distilled from the TL;DRx dataset
const EMBEDDED_CATALOG: &str = include_str!("../data/commands.json");

/// User catalog override location under the config directory
const CATALOG_FILE: &str = "commands.json";

/// Application directory name under the config directory
const APP_DIR: &str = "tldrx";

/// Default number of results shown (override with -n or --all)
const DEFAULT_LIMIT: usize = 20;

/// Platform assigned to records that carry none
const DEFAULT_PLATFORM: &str = "linux";

/// Category assigned to records that carry none
const DEFAULT_CATEGORY: &str = "general";

// ============================================================================
// Ranking Weights
// ============================================================================

/// Score boosts for the name-match tiers of the ranking ladder
struct RankWeights {
    /// Case-insensitive exact name equality
    exact_name: i32,
    /// Name starts with the query (non-exact)
    name_prefix: i32,
    /// Name contains the query as substring, short-query regime
    short_name_substring: i32,
    /// Any positive fuzzy name score, long-query regime
    name_match: i32,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            exact_name: 100_000,
            name_prefix: 50_000,
            short_name_substring: 2000,
            name_match: 1000,
        }
    }
}

/// Minimum description scores below which a description-only match is noise
struct RankThresholds {
    /// Short queries (<= 2 chars) produce noisy fuzzy hits; trust only high scores
    short_description: i32,
    /// Longer queries can afford a lower bar
    description: i32,
}

impl Default for RankThresholds {
    fn default() -> Self {
        Self {
            short_description: 50,
            description: 30,
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Failed to read catalog from {path}: {source}")]
    CatalogRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse catalog: {0}")]
    CatalogParse(String),

    #[error("Failed to encode results: {0}")]
    ResultEncode(#[from] serde_json::Error),

    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Catalog not found at {0}")]
    CatalogNotFound(PathBuf),
}

// ============================================================================
// Catalog Types
// ============================================================================

/// The complete command catalog document
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandCatalog {
    /// Catalog format version
    #[serde(default)]
    pub version: String,

    /// When the catalog was generated
    #[serde(default)]
    pub generated: String,

    /// Number of commands the generator claims to have written
    #[serde(default)]
    pub commands_count: usize,

    /// The command records; a missing or null array is tolerated
    #[serde(default)]
    pub commands: Option<Vec<RawCommand>>,
}

/// A command record as it appears on disk, before normalization.
///
/// `platform` and `category` are optional here; [`normalize`] fills them in.
/// Everything past `category` is display-only and never participates in
/// scoring.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommand {
    pub name: String,

    /// What the command name abbreviates ("ls" -> "list")
    #[serde(default)]
    pub stands_for: String,

    #[serde(default)]
    pub description: String,

    pub platform: Option<Vec<String>>,

    pub category: Option<String>,

    /// safe, caution or destructive
    #[serde(default)]
    pub safety: String,

    #[serde(default)]
    pub syntax_pattern: String,

    #[serde(default)]
    pub examples: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub related_commands: Vec<String>,

    #[serde(default)]
    pub man_page_url: Option<String>,
}

/// A normalized command record: `platform` and `category` are always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub stands_for: String,

    pub description: String,

    pub platform: Vec<String>,

    pub category: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub safety: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub syntax_pattern: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_commands: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub man_page_url: Option<String>,
}

// ============================================================================
// Record Normalization
// ============================================================================

/// Normalize raw records so every downstream consumer can rely on `platform`
/// and `category` being present.
///
/// `None` (the catalog had no command array at all) yields an empty list
/// rather than an error. An absent `platform` defaults to `["linux"]`, but an
/// explicitly empty list is preserved as-is; an absent or empty `category`
/// defaults to `"general"`. All other fields pass through unchanged. The
/// input is never mutated.
pub fn normalize(raw: Option<&[RawCommand]>) -> Vec<CommandRecord> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    raw.iter()
        .map(|cmd| CommandRecord {
            name: cmd.name.clone(),
            stands_for: cmd.stands_for.clone(),
            description: cmd.description.clone(),
            platform: cmd
                .platform
                .clone()
                .unwrap_or_else(|| vec![DEFAULT_PLATFORM.to_string()]),
            category: match cmd.category.as_deref() {
                Some(c) if !c.is_empty() => c.to_string(),
                _ => DEFAULT_CATEGORY.to_string(),
            },
            safety: cmd.safety.clone(),
            syntax_pattern: cmd.syntax_pattern.clone(),
            examples: cmd.examples.clone(),
            warnings: cmd.warnings.clone(),
            related_commands: cmd.related_commands.clone(),
            man_page_url: cmd.man_page_url.clone(),
        })
        .collect()
}

// ============================================================================
// Fuzzy Scoring
// ============================================================================

/// Score how well `query` matches `target`, case-insensitively.
///
/// A contiguous substring hit returns `100 - (len(target) - len(query))`,
/// which deliberately goes negative for targets much longer than the query;
/// callers gate on thresholds, not on sign. Otherwise the target is scanned
/// left to right for the query characters in order, with runs of adjacent
/// matches earning a growing bonus (`consecutive * 2` per character). If
/// every query character is found, the accumulated score is scaled by the
/// length ratio of query to target; if not, the result is 0.
pub fn fuzzy_score(query: &str, target: &str) -> i32 {
    let search = query.to_lowercase();
    let target = target.to_lowercase();

    // Substring match scores by how much of the target the query covers
    if target.contains(&search) {
        let target_len = target.chars().count() as i32;
        let search_len = search.chars().count() as i32;
        return 100 - (target_len - search_len);
    }

    // Fuzzy matching: all query characters must appear in order in the target
    let search_chars: Vec<char> = search.chars().collect();
    let mut search_index = 0;
    let mut score: i32 = 0;
    let mut consecutive: i32 = 0;

    for c in target.chars() {
        if search_index >= search_chars.len() {
            break;
        }
        if c == search_chars[search_index] {
            search_index += 1;
            consecutive += 1;
            score += consecutive * 2; // Bonus for consecutive matches
        } else {
            consecutive = 0;
        }
    }

    if search_index == search_chars.len() {
        let match_ratio = search_chars.len() as f64 / target.chars().count() as f64;
        return (f64::from(score) * match_ratio * 10.0).floor() as i32;
    }

    0
}

// ============================================================================
// Command Ranking
// ============================================================================

/// Score one command against a query, name matches taking priority.
///
/// Ladder, first applicable rule wins: exact name equality, name prefix,
/// then fuzzy scores over name and description. Short queries (two chars or
/// fewer) only trust a name substring hit or a high-confidence description
/// score; longer queries boost any positive name score over description-only
/// matches. Returns 0 when nothing matches.
pub fn rank_command(query: &str, command: &CommandRecord) -> i32 {
    let weights = RankWeights::default();
    let thresholds = RankThresholds::default();

    let search = query.to_lowercase();
    let name = command.name.to_lowercase();
    let query_len = search.chars().count() as i32;

    // PRIORITY 1: exact name match always appears first
    if name == search {
        return weights.exact_name;
    }

    // PRIORITY 2: prefix match, with a slight preference for shorter queries
    if name.starts_with(&search) {
        return weights.name_prefix + (100 - query_len);
    }

    let name_score = fuzzy_score(query, &command.name);
    let description_score = fuzzy_score(query, &command.description);

    // Short queries produce noisy fuzzy hits, so be strict
    if query_len <= 2 {
        if name.contains(&search) {
            return name_score + weights.short_name_substring;
        }
        if description_score > thresholds.short_description {
            return description_score;
        }
        return 0;
    }

    if name_score > 0 {
        return name_score + weights.name_match;
    }
    if description_score > thresholds.description {
        return description_score;
    }

    0
}

// ============================================================================
// Filtering & Selection
// ============================================================================

/// Keep commands whose platform list intersects the selected platforms and
/// whose category is among the selected categories. An empty selection on
/// either facet is a no-op for that facet.
pub fn filter_by_platform_and_category<'a>(
    commands: &'a [CommandRecord],
    selected_platforms: &[String],
    selected_categories: &[String],
) -> Vec<&'a CommandRecord> {
    commands
        .iter()
        .filter(|cmd| {
            selected_platforms.is_empty()
                || cmd
                    .platform
                    .iter()
                    .any(|p| selected_platforms.iter().any(|s| s == p))
        })
        .filter(|cmd| {
            selected_categories.is_empty() || selected_categories.iter().any(|c| *c == cmd.category)
        })
        .collect()
}

/// The single entry point combining facet filters with ranked text search.
///
/// A blank query returns the facet-filtered commands in catalog order,
/// unscored. A non-blank query ranks every surviving command, drops the
/// zero scores, sorts descending by score (stable, so ties keep catalog
/// order) and deduplicates by name keeping the first occurrence.
pub fn search<'a>(
    commands: &'a [CommandRecord],
    query: &str,
    selected_platforms: &[String],
    selected_categories: &[String],
) -> Vec<&'a CommandRecord> {
    let filtered =
        filter_by_platform_and_category(commands, selected_platforms, selected_categories);

    if query.trim().is_empty() {
        return filtered;
    }

    let mut scored: Vec<(i32, &CommandRecord)> = filtered
        .into_iter()
        .map(|cmd| (rank_command(query, cmd), cmd))
        .filter(|(score, _)| *score > 0)
        .collect();

    // Stable sort: equal scores retain catalog order
    scored.sort_by_key(|(score, _)| Reverse(*score));

    let mut seen: HashSet<&str> = HashSet::new();
    scored
        .into_iter()
        .filter(|(_, cmd)| seen.insert(cmd.name.as_str()))
        .map(|(_, cmd)| cmd)
        .collect()
}

// ============================================================================
// Platform & Category Labels
// ============================================================================

lazy_static! {
    /// Display name and badge per canonical platform id
    static ref PLATFORM_LABELS: HashMap<&'static str, (&'static str, &'static str)> = {
        let mut m = HashMap::new();
        m.insert("linux", ("Linux", "🐧"));
        m.insert("macos", ("macOS", "🍎"));
        m.insert("windows", ("Windows", "🪟"));
        m
    };

    /// Legacy and colloquial platform spellings accepted on the CLI
    static ref PLATFORM_ALIASES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("mac", "macos");
        m.insert("osx", "macos");
        m.insert("darwin", "macos");
        m.insert("win", "windows");
        m.insert("win32", "windows");
        m.insert("unix", "linux");
        m
    };

    /// Display names for the well-known categories
    static ref CATEGORY_LABELS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("file-operations", "File Operations");
        m.insert("package-management", "Package Management");
        m.insert("networking", "Networking");
        m.insert("text-processing", "Text Processing");
        m.insert("system", "System");
        m.insert("development", "Development");
        m.insert("shell", "Shell");
        m.insert("automation", "Automation");
        m.insert("security", "Security");
        m.insert("containers", "Containers");
        m.insert("data-processing", "Data Processing");
        m
    };
}

/// Map a user-supplied platform tag to its canonical id ("mac" -> "macos")
pub fn canonical_platform(tag: &str) -> String {
    let lower = tag.to_lowercase();
    match PLATFORM_ALIASES.get(lower.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => lower,
    }
}

/// Capitalize an unknown tag for display ("kubernetes" -> "Kubernetes")
fn capitalize(tag: &str) -> String {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn platform_label(id: &str) -> String {
    match PLATFORM_LABELS.get(id) {
        Some((name, badge)) => format!("{badge} {name}"),
        None => format!("💻 {}", capitalize(id)),
    }
}

fn category_label(id: &str) -> String {
    match CATEGORY_LABELS.get(id) {
        Some(name) => (*name).to_string(),
        None => capitalize(id),
    }
}

// ============================================================================
// Catalog Loading
// ============================================================================

/// Path of the user's catalog override
fn get_catalog_path() -> Result<PathBuf, LookupError> {
    let config = dirs::config_dir().ok_or(LookupError::NoConfigDir)?;
    Ok(config.join(APP_DIR).join(CATALOG_FILE))
}

/// Load and parse a catalog file from disk
fn load_catalog(path: &PathBuf) -> Result<CommandCatalog, LookupError> {
    if !path.exists() {
        return Err(LookupError::CatalogNotFound(path.clone()));
    }

    let content = fs::read_to_string(path).map_err(|e| LookupError::CatalogRead {
        path: path.clone(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| LookupError::CatalogParse(e.to_string()))
}

/// Parse the catalog embedded in the binary
fn load_embedded_catalog() -> Result<CommandCatalog, LookupError> {
    serde_json::from_str(EMBEDDED_CATALOG).map_err(|e| LookupError::CatalogParse(e.to_string()))
}

/// Resolve which catalog to use: an explicit `--catalog` path must exist,
/// a user override under the config directory is optional, the embedded
/// catalog is the fallback.
fn resolve_catalog(explicit: Option<&PathBuf>) -> Result<CommandCatalog, LookupError> {
    if let Some(path) = explicit {
        debug!("Loading catalog from --catalog {:?}", path);
        return load_catalog(path);
    }

    match get_catalog_path() {
        Ok(path) => match load_catalog(&path) {
            Ok(catalog) => {
                info!("Loaded user catalog from {:?}", path);
                Ok(catalog)
            }
            Err(LookupError::CatalogNotFound(_)) => {
                debug!("No user catalog at {:?}, using embedded catalog", path);
                load_embedded_catalog()
            }
            Err(e) => Err(e),
        },
        Err(LookupError::NoConfigDir) => {
            warn!("Config directory not found, using embedded catalog");
            load_embedded_catalog()
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "tldrx",
    version,
    about = "Fast command reference lookup with fuzzy search"
)]
struct Cli {
    /// Search query; omit to browse the whole catalog
    query: Vec<String>,

    /// Only show commands available on this platform (repeatable)
    #[arg(short, long = "platform", value_name = "PLATFORM")]
    platform: Vec<String>,

    /// Only show commands in this category (repeatable)
    #[arg(short, long = "category", value_name = "CATEGORY")]
    category: Vec<String>,

    /// Use a catalog file instead of the built-in one
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Maximum number of results to show
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Show every match, ignoring --limit
    #[arg(long)]
    all: bool,

    /// Show usage examples under each command
    #[arg(short, long)]
    examples: bool,

    /// Emit results as JSON instead of colored text
    #[arg(long)]
    json: bool,

    /// List the platforms present in the catalog and exit
    #[arg(long)]
    list_platforms: bool,

    /// List the categories present in the catalog and exit
    #[arg(long)]
    list_categories: bool,
}

// ============================================================================
// Rendering
// ============================================================================

fn safety_marker(safety: &str) -> Option<colored::ColoredString> {
    match safety {
        "destructive" => Some("⚠ destructive".red().bold()),
        "caution" => Some("caution".yellow()),
        _ => None,
    }
}

/// Render matches as colored text, one block per command
fn render_results(results: &[&CommandRecord], show_examples: bool) {
    for cmd in results {
        let badges: Vec<String> = cmd.platform.iter().map(|p| platform_label(p)).collect();

        let mut header = format!("{}", cmd.name.green().bold());
        if !cmd.stands_for.is_empty() && cmd.stands_for != cmd.name {
            header.push_str(&format!("  {}", format!("({})", cmd.stands_for).dimmed()));
        }
        if let Some(marker) = safety_marker(&cmd.safety) {
            header.push_str(&format!("  [{marker}]"));
        }
        println!("{header}");

        println!("  {}", cmd.description);
        println!(
            "  {}  {}",
            badges.join(" ").dimmed(),
            category_label(&cmd.category).cyan()
        );

        if !cmd.syntax_pattern.is_empty() {
            println!("  {}", cmd.syntax_pattern.italic().dimmed());
        }

        if show_examples {
            for example in &cmd.examples {
                println!("    {}", example.yellow());
            }
            for warning in &cmd.warnings {
                println!("    {}", warning.red());
            }
            if !cmd.related_commands.is_empty() {
                println!(
                    "    {} {}",
                    "related:".dimmed(),
                    cmd.related_commands.join(", ").dimmed()
                );
            }
        }

        println!();
    }
}

/// Print one facet (platforms or categories) with per-tag record counts
fn render_facet<F>(total: usize, label_fn: F, counts: BTreeMap<String, usize>)
where
    F: Fn(&str) -> String,
{
    for (tag, count) in counts {
        println!(
            "{}  {} ({} of {} commands)",
            tag.bold(),
            label_fn(&tag),
            count,
            total
        );
    }
}

fn collect_platform_counts(records: &[CommandRecord]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        for platform in &record.platform {
            *counts.entry(platform.clone()).or_insert(0) += 1;
        }
    }
    counts
}

fn collect_category_counts(records: &[CommandRecord]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.category.clone()).or_insert(0) += 1;
    }
    counts
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize tracing if RUST_LOG is set
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        error!("Error: {}", e);
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), LookupError> {
    let cli = Cli::parse();

    let catalog = resolve_catalog(cli.catalog.as_ref())?;
    if !catalog.version.is_empty() {
        debug!(
            "Catalog version {} generated {}",
            catalog.version, catalog.generated
        );
    }

    let records = normalize(catalog.commands.as_deref());
    info!("Loaded {} commands from catalog", records.len());

    if cli.list_platforms {
        render_facet(
            records.len(),
            platform_label,
            collect_platform_counts(&records),
        );
        return Ok(());
    }
    if cli.list_categories {
        render_facet(
            records.len(),
            category_label,
            collect_category_counts(&records),
        );
        return Ok(());
    }

    let query = cli.query.join(" ");
    let platforms: Vec<String> = cli.platform.iter().map(|p| canonical_platform(p)).collect();
    let categories: Vec<String> = cli.category.iter().map(|c| c.to_lowercase()).collect();

    debug!(
        "Searching query={:?} platforms={:?} categories={:?}",
        query, platforms, categories
    );

    let mut results = search(&records, &query, &platforms, &categories);
    let total = results.len();

    if !cli.all && results.len() > cli.limit {
        results.truncate(cli.limit);
    }

    info!(
        "{} of {} commands match, showing {}",
        total,
        records.len(),
        results.len()
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!(
            "{}",
            format!("No commands match \"{}\"", query.trim()).dimmed()
        );
        return Ok(());
    }

    render_results(&results, cli.examples);

    if total > results.len() {
        println!(
            "{}",
            format!("... and {} more (use --all or -n)", total - results.len()).dimmed()
        );
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

use clap::{ArgAction, Parser};
use scl_core::DEFAULT_VERSION;
use std::path::PathBuf;

const DEFAULT_TEMPLATE_STRINGS: &str = "# req-Id:,# req-traceability:";

/// Command-line interface of the `scl-lsp` binary.
///
/// Every flag can also be set through an `SCL_LSP_*` environment variable,
/// which editors find easier to configure than arguments.
///
/// # Examples
///
/// ```
/// use clap::Parser;
/// use scl_lsp::config::Cli;
///
/// let cli = Cli::parse_from([
///     "scl-lsp",
///     "--needs-path", "build/needs.json",
///     "--template-strings", "# req-Id:",
/// ]);
/// let config = cli.server_config();
///
/// assert_eq!(config.markers, ["# req-Id:"]);
/// assert!(config.enabled);
/// ```
#[derive(Parser, Debug, Clone)]
#[command(name = "scl-lsp")]
#[command(about = "Language server for need/requirement traceability markers")]
#[command(version)]
pub struct Cli {
    /// Path to the needs.json snapshot
    #[arg(long, env = "SCL_LSP_NEEDS_PATH", default_value = "needs.json")]
    pub needs_path: PathBuf,

    /// Root of the documentation sources that define the needs
    #[arg(long, env = "SCL_LSP_DOCS_PATH", default_value = "docs")]
    pub docs_path: PathBuf,

    /// Comma-separated line prefixes that introduce need references
    #[arg(long, env = "SCL_LSP_TEMPLATE_STRINGS", default_value = DEFAULT_TEMPLATE_STRINGS)]
    pub template_strings: String,

    /// Set to false to exit immediately without serving
    #[arg(
        long,
        alias = "enable",
        env = "SCL_LSP_ENABLED",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub enabled: bool,

    /// Snapshot version to load from needs.json
    #[arg(long, env = "SCL_LSP_NEEDS_VERSION", default_value = DEFAULT_VERSION)]
    pub needs_version: String,

    /// Token prefix that triggers marker snippet completion
    #[arg(long, env = "SCL_LSP_MARKER_STEM", default_value = "req-")]
    pub marker_stem: String,

    /// File extension of documentation sources
    #[arg(long, env = "SCL_LSP_DEFINITION_EXTENSION", default_value = "rst")]
    pub definition_extension: String,

    /// Write logs to this file (truncated on start) instead of stderr
    #[arg(long, env = "SCL_LSP_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Builds the immutable server configuration from parsed flags.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            needs_path: self.needs_path.clone(),
            docs_path: self.docs_path.clone(),
            markers: parse_markers(&self.template_strings),
            enabled: self.enabled,
            needs_version: self.needs_version.clone(),
            marker_stem: self.marker_stem.clone(),
            definition_extension: self.definition_extension.clone(),
        }
    }
}

/// Process-wide configuration, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub needs_path: PathBuf,
    pub docs_path: PathBuf,
    /// Recognized marker prefixes, e.g. `# req-Id:`, checked in order.
    pub markers: Vec<String>,
    pub enabled: bool,
    pub needs_version: String,
    pub marker_stem: String,
    pub definition_extension: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            needs_path: PathBuf::from("needs.json"),
            docs_path: PathBuf::from("docs"),
            markers: parse_markers(DEFAULT_TEMPLATE_STRINGS),
            enabled: true,
            needs_version: DEFAULT_VERSION.to_string(),
            marker_stem: "req-".to_string(),
            definition_extension: "rst".to_string(),
        }
    }
}

impl ServerConfig {
    /// Marker keywords in marker order, e.g. `req-Id:` for `# req-Id:`.
    pub fn marker_keywords(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(|marker| marker_keyword(marker))
    }
}

/// Splits a comma-separated marker list, dropping empty entries.
fn parse_markers(template_strings: &str) -> Vec<String> {
    template_strings
        .split(',')
        .map(str::trim)
        .filter(|marker| !marker.is_empty())
        .map(str::to_string)
        .collect()
}

/// The last whitespace-separated token of a marker: `# req-Id:` → `req-Id:`.
pub fn marker_keyword(marker: &str) -> &str {
    marker.split_whitespace().next_back().unwrap_or(marker)
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use snip_core::LinterKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: human, json"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ExtractArgs {
    #[arg(long, default_value = "archives", help = "Directory of conversation archive JSON files")]
    pub archives: PathBuf,

    #[arg(long, default_value = "snippets", help = "Directory receiving one folder per conversation")]
    pub output: PathBuf,

    #[arg(
        long,
        default_value = "results/extraction_report.json",
        help = "Where to write the extraction tallies"
    )]
    pub report: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct InventoryArgs {
    #[arg(long, default_value = "archives", help = "Directory of conversation archive JSON files")]
    pub archives: PathBuf,

    #[arg(long, default_value = "results/language_census.json")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ClassifyArgs {
    #[arg(long, default_value = "snippets", help = "Snippet corpus root")]
    pub snippets: PathBuf,

    #[arg(long, default_value = "results/classification")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct RulesArgs {
    #[arg(long, default_value = "results/pylint_rules.json")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct LintArgs {
    #[arg(long, value_parser = parse_linter, help = "pylint, flake8, bandit or eslint")]
    pub tool: LinterKind,

    #[arg(
        long,
        help = "Snippet list, one path per line (default: the accepted list for the tool's language)"
    )]
    pub list: Option<PathBuf>,

    #[arg(long, help = "Output JSON (default: results/lint_<tool>.json)")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Per-file timeout override in seconds")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct CategorizeArgs {
    #[arg(long, value_parser = parse_linter)]
    pub tool: LinterKind,

    #[arg(long, help = "Lint report JSON (default: results/lint_<tool>.json)")]
    pub input: Option<PathBuf>,

    #[arg(long, default_value = "results/pylint_rules.json", help = "Rule catalog, used when present")]
    pub catalog: PathBuf,

    #[arg(long, default_value = "results")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct SeverityArgs {
    #[arg(long, default_value = "results/lint_bandit.json")]
    pub input: PathBuf,

    #[arg(long, default_value = "results")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct MatchArgs {
    #[arg(long, default_value = "archives", help = "Directory of conversation archive JSON files")]
    pub archives: PathBuf,

    #[arg(
        long = "list",
        value_name = "FILE",
        help = "Snippet lists to match (default: both accepted lists)"
    )]
    pub lists: Vec<PathBuf>,

    #[arg(long, default_value = "results/provenance")]
    pub output: PathBuf,

    #[arg(long, help = "Keep only mappings whose URL is a .py or .js file")]
    pub source_files_only: bool,

    #[arg(long, help = "Title similarity threshold override")]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct FetchArgs {
    #[arg(long, default_value = "results/provenance/snippet_to_source.json")]
    pub mappings: PathBuf,

    #[arg(long, default_value = "snippets", help = "Snippet corpus root")]
    pub snippets: PathBuf,

    #[arg(long, default_value = "results/reuse.json")]
    pub output: PathBuf,

    #[arg(long, help = "Content similarity threshold override")]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct HistoryArgs {
    #[arg(long, default_value = "results/reuse.json")]
    pub reuse: PathBuf,

    #[arg(long, default_value = "results/history.json")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct DriftArgs {
    #[arg(long, default_value = "results/history.json")]
    pub history: PathBuf,

    #[arg(long, default_value = "results/drift.json")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct LintUpstreamArgs {
    #[arg(long, default_value = "results/reuse.json")]
    pub reuse: PathBuf,

    #[arg(long, default_value = "results/upstream_lint.json")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ReportArgs {
    #[arg(long, default_value = "results/drift.json")]
    pub drift: PathBuf,

    #[arg(long, default_value = "results/report")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Commands {
    /// Write every Python and JavaScript code block to the snippet corpus
    Extract(ExtractArgs),
    /// Count code blocks and conversations per language tag
    Inventory(InventoryArgs),
    /// Classify snippets by parse outcome and build the accepted corpus lists
    Classify(ClassifyArgs),
    /// Build the pylint rule catalog from `pylint --list-msgs`
    Rules(RulesArgs),
    /// Run one linter over a snippet list
    Lint(LintArgs),
    /// Group lint findings into issue categories
    Categorize(CategorizeArgs),
    /// Summarize bandit findings by severity
    Severity(SeverityArgs),
    /// Map snippets to upstream source files by conversation title
    Match(MatchArgs),
    /// Fetch matched upstream files and compare them with the snippets
    Fetch(FetchArgs),
    /// Collect the first and last revision of each matched upstream file
    History(HistoryArgs),
    /// Lint both revisions and count fixed, introduced and unchanged issues
    Drift(DriftArgs),
    /// Lint upstream code whose local snippet is missing
    LintUpstream(LintUpstreamArgs),
    /// Summarize drift results overall and per language
    Report(ReportArgs),
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Static-analysis pipeline for shared conversation code snippets")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Workspace root holding .snip/config.toml and relative inputs"
    )]
    pub workspace: PathBuf,

    #[arg(
        long,
        global = true,
        default_value = "human",
        value_parser = parse_log_format,
        help = "Log format: human or json"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

fn parse_linter(value: &str) -> Result<LinterKind, String> {
    value.parse()
}

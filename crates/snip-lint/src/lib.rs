mod catalog;
mod categorize;
mod filter;
mod parse;
mod runner;

use std::collections::BTreeMap;

use snip_core::Diagnostic;
use thiserror::Error;

pub use catalog::{RuleCatalog, RuleEntry};
pub use categorize::{
    CategorySummary, Categorizer, CodeCount, RuleAction, RuleTable, SMELL_KEYWORDS,
    VULNERABILITY_KEYWORDS, rank_codes, summarize_by_category,
};
pub use filter::NoiseFilter;
pub use parse::{FATAL_PARSE_ERROR, infer_severity, parse_tool_output};
pub use runner::{LintRunner, Linter, ToolCommand, lint_paths};

/// Diagnostics per snippet path, as written by the lint stage.
pub type LintReport = BTreeMap<String, Vec<Diagnostic>>;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
    #[error("{tool} produced unreadable output: {source}")]
    Output {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

mod corpus;
mod drift;
mod extract;
mod history;
mod output;
mod provenance;
mod report;
mod reuse;

use std::path::PathBuf;

use snip_core::ArchiveError;
use snip_hosting::HostingError;
use snip_lint::LintError;
use snip_parse::ClassifyError;
use thiserror::Error;

pub use corpus::{
    ClassificationOutputs, ClassifiedSnippet, CorpusClassification, accepted_list_name,
    classify_corpus, render_summary, write_classification_outputs,
};
pub use drift::{DriftAnalyzer, DriftCounts, DriftRun, SnippetDrift, compare_diagnostics, issue_identity};
pub use extract::{
    ExtractionReport, LanguageCensusEntry, archive_files, census_directory, extract_archive,
    extract_directory, write_snippets,
};
pub use history::{HistoryRun, HistorySkip, RevisionPair, collect_revision_pairs};
pub use output::{CsvTable, read_json, read_path_list, write_json, write_path_list, write_text};
pub use provenance::{
    INVALID_PATH, MatchKind, ProvenanceMapping, ProvenanceOutputs, ProvenanceRun, TitleMatch,
    UpstreamIndex, match_snippets, match_title, normalize_title, retain_source_urls,
    similarity_ratio, write_provenance_outputs,
};
pub use report::{
    DriftSummary, LanguageDrift, SeverityRow, SeverityRule, SnippetDelta, category_table, drift_table,
    language_table, severity_rows, severity_table, snippet_deltas, summarize_drift,
    summarize_drift_by_language, top_rules_table, top_severity_rules,
};
pub use reuse::{
    Pacing, ReuseEntry, ReuseRun, ReuseStatus, UpstreamLint, UpstreamLintReport, compare_code,
    compare_reuse, lint_upstream, looks_like_source, resolve_local_snippet,
};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },
    #[error("required input not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    Lint(#[from] LintError),
    #[error(transparent)]
    Hosting(#[from] HostingError),
}

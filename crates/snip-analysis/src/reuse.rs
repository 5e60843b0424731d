use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use snip_config::HostingConfig;
use snip_core::{Diagnostic, Language, LinterKind, normalize_path};
use snip_hosting::{BlobLocation, FetchOutcome, FetchStatus, SourceHost};
use snip_lint::{CodeCount, Linter, rank_codes};

use crate::provenance::{ProvenanceMapping, similarity_ratio};

const MIN_SOURCE_CHARS: usize = 50;
const MIN_JAVASCRIPT_LINES: usize = 5;

static PYTHON_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(def |class |import |from |if |else |for |while |try |except )").expect("valid regex")
});
static JAVASCRIPT_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(function |const |let |var |if |else |for |while |try |catch |=>|\bclass\b)")
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReuseStatus {
    Exact,
    Modified,
    Different,
    ComparisonFailed,
    NoUrl,
    FetchFailed,
    OriginalMissing,
}

impl ReuseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Modified => "modified",
            Self::Different => "different",
            Self::ComparisonFailed => "comparison_failed",
            Self::NoUrl => "no_url",
            Self::FetchFailed => "fetch_failed",
            Self::OriginalMissing => "original_missing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReuseEntry {
    pub status: ReuseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_status: Option<FetchStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// Upstream content, kept only when the local snippet could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_code: Option<String>,
}

impl ReuseEntry {
    fn new(status: ReuseStatus, url: Option<&str>) -> Self {
        Self {
            status,
            url: url.map(ToOwned::to_owned),
            fetch_status: None,
            http_status: None,
            similarity: None,
            fetched_code: None,
        }
    }

    /// `fetch_failed_<status>` for fetch failures, the plain status otherwise.
    pub fn tally_key(&self) -> String {
        match (self.status, self.fetch_status) {
            (ReuseStatus::FetchFailed, Some(fetch)) => format!("fetch_failed_{}", fetch.as_str()),
            (status, _) => status.as_str().to_owned(),
        }
    }
}

/// Compares trimmed texts: exact, then `modified` above the threshold, else `different`.
pub fn compare_code(local: &str, fetched: &str, threshold: f64) -> (ReuseStatus, Option<f64>) {
    let local = local.trim();
    let fetched = fetched.trim();
    if local.is_empty() || fetched.is_empty() {
        return (ReuseStatus::ComparisonFailed, None);
    }
    if local == fetched {
        return (ReuseStatus::Exact, Some(1.0));
    }

    let ratio = similarity_ratio(local, fetched);
    if ratio > threshold {
        (ReuseStatus::Modified, Some(ratio))
    } else {
        (ReuseStatus::Different, Some(ratio))
    }
}

/// Sleep schedule applied between hosting requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub every: usize,
    pub pause: Duration,
}

impl Pacing {
    pub fn from_config(config: &HostingConfig) -> Self {
        Self {
            every: config.pace_every,
            pause: Duration::from_secs(config.pace_secs),
        }
    }

    pub fn none() -> Self {
        Self {
            every: 0,
            pause: Duration::ZERO,
        }
    }

    pub fn should_pause(&self, processed: usize) -> bool {
        self.every > 0 && !self.pause.is_zero() && processed > 0 && processed % self.every == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReuseRun {
    pub entries: BTreeMap<String, ReuseEntry>,
    pub tallies: BTreeMap<String, usize>,
}

/// Finds a snippet on disk: the key itself, the key under `root`, or the
/// `<conversation>/<file>` tail of the key under `root`.
pub fn resolve_local_snippet(root: &Path, key: &str) -> Option<PathBuf> {
    let normalized = normalize_path(key);
    let direct = PathBuf::from(&normalized);
    if direct.is_file() {
        return Some(direct);
    }
    if direct.is_relative() {
        let joined = root.join(&normalized);
        if joined.is_file() {
            return Some(joined);
        }
    }

    let mut tail = normalized.rsplit('/').filter(|part| !part.is_empty());
    let file = tail.next()?;
    let conversation = tail.next()?;
    let nested = root.join(conversation).join(file);
    nested.is_file().then_some(nested)
}

pub fn compare_reuse(
    host: &dyn SourceHost,
    mappings: &BTreeMap<String, ProvenanceMapping>,
    snippets_root: &Path,
    threshold: f64,
    pacing: Pacing,
    sleep: &mut dyn FnMut(Duration),
) -> ReuseRun {
    let mut run = ReuseRun::default();

    for (index, (snippet, mapping)) in mappings.iter().enumerate() {
        if pacing.should_pause(index) {
            tracing::debug!(processed = index, pause_secs = pacing.pause.as_secs(), "pacing requests");
            sleep(pacing.pause);
        }

        let entry = compare_one(host, snippet, mapping, snippets_root, threshold);
        *run.tallies.entry(entry.tally_key()).or_insert(0) += 1;
        run.entries.insert(snippet.clone(), entry);
    }

    tracing::info!(compared = run.entries.len(), "reuse comparison finished");
    run
}

fn compare_one(
    host: &dyn SourceHost,
    snippet: &str,
    mapping: &ProvenanceMapping,
    snippets_root: &Path,
    threshold: f64,
) -> ReuseEntry {
    let url = mapping.url.trim();
    if url.is_empty() {
        return ReuseEntry::new(ReuseStatus::NoUrl, None);
    }

    let outcome = match BlobLocation::parse(url) {
        Some(location) => host.fetch_file(&location),
        None => FetchOutcome::failed(FetchStatus::InvalidUrl, None),
    };
    let fetched = match outcome.content {
        Some(content) if outcome.status == FetchStatus::Success => content,
        _ => {
            tracing::debug!(snippet = %snippet, status = outcome.status.as_str(), "fetch failed");
            let mut entry = ReuseEntry::new(ReuseStatus::FetchFailed, Some(url));
            entry.fetch_status = Some(outcome.status);
            entry.http_status = outcome.http_status;
            return entry;
        }
    };

    let local = resolve_local_snippet(snippets_root, snippet).and_then(|path| {
        fs::read_to_string(&path)
            .inspect_err(|err| tracing::warn!(path = %path.display(), error = %err, "failed to read snippet"))
            .ok()
    });
    let Some(local) = local else {
        let mut entry = ReuseEntry::new(ReuseStatus::OriginalMissing, Some(url));
        entry.fetch_status = Some(FetchStatus::Success);
        entry.fetched_code = Some(fetched);
        return entry;
    };

    let (status, similarity) = compare_code(&local, &fetched, threshold);
    let mut entry = ReuseEntry::new(status, Some(url));
    entry.fetch_status = Some(FetchStatus::Success);
    entry.similarity = similarity;
    entry
}

/// Rejects fragments: at least 50 non-blank characters and a recognizable
/// keyword; JavaScript also needs more than five non-comment lines.
pub fn looks_like_source(code: &str, language: Language) -> bool {
    let stripped = code.trim();
    if stripped.chars().filter(|ch| !ch.is_whitespace()).count() < MIN_SOURCE_CHARS {
        return false;
    }

    match language {
        Language::Python => PYTHON_SOURCE.is_match(stripped),
        Language::JavaScript => {
            let code_lines = stripped
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with("//"))
                .count();
            code_lines > MIN_JAVASCRIPT_LINES && JAVASCRIPT_SOURCE.is_match(stripped)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamLint {
    pub url: String,
    pub language: Language,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamLintReport {
    pub entries: BTreeMap<String, UpstreamLint>,
    pub top_codes: BTreeMap<Language, Vec<CodeCount>>,
    pub skipped: usize,
    /// Entries whose scratch file could not be written.
    #[serde(default)]
    pub failed: usize,
}

/// Lints the upstream copy of every reuse entry whose local snippet was missing.
/// Scratch files go to `scratch_dir`, or the system temp directory when `None`.
pub fn lint_upstream(
    linter: &dyn Linter,
    reuse: &BTreeMap<String, ReuseEntry>,
    top_n: usize,
    scratch_dir: Option<&Path>,
) -> UpstreamLintReport {
    let mut report = UpstreamLintReport::default();
    let mut codes: BTreeMap<Language, BTreeMap<String, (usize, String)>> = BTreeMap::new();

    for (snippet, entry) in reuse {
        if entry.status != ReuseStatus::OriginalMissing {
            continue;
        }
        let (Some(url), Some(code)) = (entry.url.as_deref(), entry.fetched_code.as_deref()) else {
            continue;
        };
        let Some(language) = Language::from_path(url) else {
            report.skipped += 1;
            continue;
        };
        if !looks_like_source(code, language) {
            tracing::debug!(snippet = %snippet, "upstream code does not look like source");
            report.skipped += 1;
            continue;
        }

        let file = match write_scratch(code, language, scratch_dir) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(snippet = %snippet, error = %err, "failed to write upstream scratch file");
                report.failed += 1;
                continue;
            }
        };

        let diagnostics = linter.lint_file(LinterKind::default_for(language), file.path());
        let language_codes = codes.entry(language).or_default();
        for diagnostic in &diagnostics {
            language_codes
                .entry(diagnostic.code.clone())
                .or_insert_with(|| (0, diagnostic.message.clone()))
                .0 += 1;
        }
        report.entries.insert(
            snippet.clone(),
            UpstreamLint {
                url: url.to_owned(),
                language,
                diagnostics,
            },
        );
    }

    report.top_codes = codes
        .into_iter()
        .map(|(language, counts)| (language, rank_codes(counts, top_n)))
        .collect();
    report
}

fn write_scratch(
    code: &str,
    language: Language,
    scratch_dir: Option<&Path>,
) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = format!(".{}", language.extension());
    let mut builder = tempfile::Builder::new();
    builder.prefix("upstream_").suffix(&suffix);
    let mut file = match scratch_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(code.as_bytes())?;
    file.flush()?;
    Ok(file)
}

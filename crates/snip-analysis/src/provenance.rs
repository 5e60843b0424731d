use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use snip_config::MatchingConfig;
use snip_core::{ParsedArchive, normalize_path};

use crate::AnalysisError;
use crate::output::write_json;

pub const INVALID_PATH: &str = "Invalid path";
const LANGUAGE_SUFFIXES: [&str; 2] = [" python", " javascript"];
const RATIO_TIMEOUT: Duration = Duration::from_secs(1);

/// Canonical join key for a conversation title.
///
/// The translation table is consulted with the raw title only. Otherwise every
/// run of characters other than alphanumerics and `-` becomes one space, the
/// result is trimmed and lowercased, and trailing language qualifiers are
/// removed. Normalizing an already-normalized title returns it unchanged.
pub fn normalize_title(raw: &str, translations: &BTreeMap<String, String>) -> String {
    if let Some(translated) = translations.get(raw) {
        return translated.clone();
    }

    let mut normalized = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        if ch.is_alphanumeric() || ch == '-' {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }

    while let Some(stripped) = LANGUAGE_SUFFIXES
        .iter()
        .find_map(|suffix| normalized.strip_suffix(suffix))
    {
        normalized = stripped.trim_end().to_owned();
    }
    normalized
}

/// Character-level similarity in `0.0..=1.0`; `2 * matches / (len(a) + len(b))`.
pub fn similarity_ratio(left: &str, right: &str) -> f64 {
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let diff = TextDiff::configure()
        .timeout(RATIO_TIMEOUT)
        .diff_chars(left, right);
    f64::from(diff.ratio())
}

/// Normalized upstream title to source URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamIndex {
    titles: BTreeMap<String, String>,
}

impl UpstreamIndex {
    pub fn from_archive(archive: &ParsedArchive, translations: &BTreeMap<String, String>) -> Self {
        let mut index = Self::default();
        index.add_archive(archive, translations);
        index
    }

    /// Indexes sharings with both a title and a source URL. A later duplicate title wins.
    pub fn add_archive(&mut self, archive: &ParsedArchive, translations: &BTreeMap<String, String>) {
        for source in &archive.sources {
            let Some(url) = source.url.as_deref() else {
                continue;
            };
            for sharing in &source.sharings {
                if let Some(title) = sharing.title.as_deref() {
                    self.titles
                        .insert(normalize_title(title, translations), url.to_owned());
                }
            }
        }
    }

    pub fn from_titles(titles: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            titles: titles.into_iter().collect(),
        }
    }

    pub fn url_for(&self, normalized: &str) -> Option<&str> {
        self.titles.get(normalized).map(String::as_str)
    }

    pub fn titles(&self) -> impl Iterator<Item = &String> {
        self.titles.keys()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TitleMatch {
    Exact(String),
    Fuzzy { title: String, score: f64 },
    Unmatched,
}

/// Exact lookup, then the single best fuzzy candidate at or above the threshold.
/// Equal scores resolve to the lexicographically smallest title.
pub fn match_title(index: &UpstreamIndex, normalized: &str, threshold: f64) -> TitleMatch {
    if index.url_for(normalized).is_some() {
        return TitleMatch::Exact(normalized.to_owned());
    }

    let mut best: Option<(&String, f64)> = None;
    for candidate in index.titles() {
        let score = similarity_ratio(normalized, candidate);
        if score < threshold {
            continue;
        }
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((title, score)) => TitleMatch::Fuzzy {
            title: title.clone(),
            score,
        },
        None => TitleMatch::Unmatched,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceMapping {
    pub url: String,
    pub match_kind: MatchKind,
    pub score: f64,
    pub conversation: String,
    pub upstream_title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRun {
    pub mappings: BTreeMap<String, ProvenanceMapping>,
    /// `(raw title, normalized title)`, or `(path, "Invalid path")`.
    pub unmapped: Vec<(String, String)>,
    pub unmatched_upstream: Vec<String>,
}

impl ProvenanceRun {
    pub fn exact_matches(&self) -> usize {
        self.mappings
            .values()
            .filter(|mapping| mapping.match_kind == MatchKind::Exact)
            .count()
    }

    pub fn fuzzy_matches(&self) -> usize {
        self.mappings
            .values()
            .filter(|mapping| mapping.match_kind == MatchKind::Fuzzy)
            .count()
    }
}

/// Maps each snippet path to at most one upstream URL via its parent directory title.
pub fn match_snippets(
    snippet_paths: &[String],
    index: &UpstreamIndex,
    config: &MatchingConfig,
) -> ProvenanceRun {
    let threshold = config.threshold.clamp(0.0, 1.0);
    let mut run = ProvenanceRun::default();
    let mut used_titles = BTreeSet::new();
    let mut memo: BTreeMap<String, TitleMatch> = BTreeMap::new();

    for snippet in snippet_paths {
        let Some(title) = parent_title(snippet) else {
            tracing::warn!(snippet = %snippet, "snippet path has no conversation directory");
            run.unmapped.push((snippet.clone(), INVALID_PATH.to_owned()));
            continue;
        };
        let normalized = normalize_title(&title, &config.translations);
        let outcome = memo
            .entry(normalized.clone())
            .or_insert_with(|| match_title(index, &normalized, threshold))
            .clone();

        let (upstream_title, match_kind, score) = match outcome {
            TitleMatch::Exact(upstream) => (upstream, MatchKind::Exact, 1.0),
            TitleMatch::Fuzzy { title, score } => {
                tracing::debug!(from = %normalized, to = %title, score, "fuzzy title match");
                (title, MatchKind::Fuzzy, score)
            }
            TitleMatch::Unmatched => {
                tracing::debug!(title = %normalized, "no upstream title match");
                run.unmapped.push((title, normalized));
                continue;
            }
        };
        let Some(url) = index.url_for(&upstream_title) else {
            continue;
        };

        used_titles.insert(upstream_title.clone());
        run.mappings.insert(
            snippet.clone(),
            ProvenanceMapping {
                url: url.to_owned(),
                match_kind,
                score,
                conversation: title,
                upstream_title,
            },
        );
    }

    run.unmatched_upstream = index
        .titles()
        .filter(|title| !used_titles.contains(*title))
        .cloned()
        .collect();
    run
}

fn parent_title(snippet_path: &str) -> Option<String> {
    let normalized = normalize_path(snippet_path);
    let parts = normalized
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>();
    if parts.len() < 2 {
        return None;
    }
    Some(parts[parts.len() - 2].to_owned())
}

/// Keeps mappings whose URL points at a Python or JavaScript file.
pub fn retain_source_urls(mappings: &mut BTreeMap<String, ProvenanceMapping>) -> usize {
    let before = mappings.len();
    mappings.retain(|_, mapping| {
        let url = mapping.url.to_ascii_lowercase();
        url.ends_with(".py") || url.ends_with(".js")
    });
    before - mappings.len()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceOutputs {
    pub mappings: PathBuf,
    pub unmapped: PathBuf,
    pub unmatched_upstream: PathBuf,
}

pub fn write_provenance_outputs(
    run: &ProvenanceRun,
    output_dir: &Path,
) -> Result<ProvenanceOutputs, AnalysisError> {
    let outputs = ProvenanceOutputs {
        mappings: output_dir.join("snippet_to_source.json"),
        unmapped: output_dir.join("unmapped_titles.json"),
        unmatched_upstream: output_dir.join("unmatched_source_titles.json"),
    };
    write_json(&outputs.mappings, &run.mappings)?;
    write_json(&outputs.unmapped, &run.unmapped)?;
    write_json(&outputs.unmatched_upstream, &run.unmatched_upstream)?;
    Ok(outputs)
}

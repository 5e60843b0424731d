use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snip_core::{Language, ParsedArchive, Snippet, load_archive, normalize_path, sanitize_name};

use crate::AnalysisError;

/// Tallies for one extraction run. Every code block lands in exactly one bucket:
/// saved, skipped (empty), unknown tag, or untagged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub archives: usize,
    pub saved: usize,
    pub skipped_empty: usize,
    pub malformed: usize,
    pub detected: BTreeMap<Language, usize>,
    pub unknown_tags: BTreeSet<String>,
    #[serde(default)]
    pub snippets: Vec<Snippet>,
}

impl ExtractionReport {
    fn merge(&mut self, other: ExtractionReport) {
        self.archives += other.archives;
        self.saved += other.saved;
        self.skipped_empty += other.skipped_empty;
        self.malformed += other.malformed;
        for (language, count) in other.detected {
            *self.detected.entry(language).or_insert(0) += count;
        }
        self.unknown_tags.extend(other.unknown_tags);
        self.snippets.extend(other.snippets);
    }
}

/// Top-level `*.json` files, sorted by name.
pub fn archive_files(dir: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    let entries = fs::read_dir(dir).map_err(|source| AnalysisError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn extract_directory(archive_dir: &Path, output_dir: &Path) -> Result<ExtractionReport, AnalysisError> {
    let mut report = ExtractionReport::default();
    for archive in archive_files(archive_dir)? {
        report.merge(extract_archive(&archive, output_dir)?);
    }
    Ok(report)
}

pub fn extract_archive(archive_path: &Path, output_dir: &Path) -> Result<ExtractionReport, AnalysisError> {
    let parsed = load_archive(archive_path).map_err(|source| AnalysisError::Archive {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let archive_name = archive_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let report = write_snippets(&archive_name, &parsed, output_dir)?;
    tracing::info!(
        archive = %archive_path.display(),
        saved = report.saved,
        skipped = report.skipped_empty,
        malformed = report.malformed,
        "extracted archive"
    );
    Ok(report)
}

/// Writes recognized, non-empty code blocks to `<output>/<conversation>/snippet_<src>_<sharing>_<n>.<ext>`.
pub fn write_snippets(
    archive_name: &str,
    archive: &ParsedArchive,
    output_dir: &Path,
) -> Result<ExtractionReport, AnalysisError> {
    let mut report = ExtractionReport {
        archives: 1,
        malformed: archive.malformed,
        ..ExtractionReport::default()
    };

    for source in &archive.sources {
        for sharing in &source.sharings {
            let raw_name = sharing.title.clone().unwrap_or_else(|| {
                format!("{archive_name}_S{}_C{}", source.index, sharing.index)
            });
            let conversation = sanitize_name(&raw_name);
            let conversation_dir = output_dir.join(&conversation);
            let mut sequence = 1usize;

            let blocks = sharing
                .conversations
                .iter()
                .flat_map(|turn| turn.code_blocks.iter());
            for block in blocks {
                let tag = block.kind.as_deref().unwrap_or_default();
                let Some(language) = Language::from_tag(tag) else {
                    let tag = tag.trim().to_lowercase();
                    if !tag.is_empty() {
                        report.unknown_tags.insert(tag);
                    }
                    continue;
                };
                *report.detected.entry(language).or_insert(0) += 1;

                let content = block.content.as_deref().unwrap_or_default();
                if content.trim().is_empty() {
                    report.skipped_empty += 1;
                    continue;
                }

                fs::create_dir_all(&conversation_dir)?;
                let file_name = Snippet::file_name(source.index, sharing.index, sequence, language);
                let path = conversation_dir.join(&file_name);
                fs::write(&path, content)?;

                report.snippets.push(Snippet {
                    conversation: conversation.clone(),
                    source_index: source.index,
                    sharing_index: sharing.index,
                    sequence,
                    language,
                    path: normalize_path(&path.to_string_lossy()),
                    content: content.to_owned(),
                });
                report.saved += 1;
                sequence += 1;
            }
        }
    }

    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCensusEntry {
    pub language: String,
    pub snippets: usize,
    pub conversations: usize,
}

/// Snippet and conversation counts per raw language tag across every archive in
/// a directory, largest first.
pub fn census_directory(archive_dir: &Path) -> Result<Vec<LanguageCensusEntry>, AnalysisError> {
    let mut snippets: BTreeMap<String, usize> = BTreeMap::new();
    let mut conversations: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for archive_path in archive_files(archive_dir)? {
        let parsed = load_archive(&archive_path).map_err(|source| AnalysisError::Archive {
            path: archive_path.clone(),
            source,
        })?;
        let archive_name = archive_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        census_archive(&archive_name, &parsed, &mut snippets, &mut conversations);
    }

    let mut entries = snippets
        .into_iter()
        .map(|(language, count)| LanguageCensusEntry {
            conversations: conversations.get(&language).map_or(0, BTreeSet::len),
            language,
            snippets: count,
        })
        .collect::<Vec<_>>();
    entries.sort_by(|left, right| {
        right
            .snippets
            .cmp(&left.snippets)
            .then_with(|| left.language.cmp(&right.language))
    });
    Ok(entries)
}

fn census_archive(
    archive_name: &str,
    archive: &ParsedArchive,
    snippets: &mut BTreeMap<String, usize>,
    conversations: &mut BTreeMap<String, BTreeSet<String>>,
) {
    for source in &archive.sources {
        for sharing in &source.sharings {
            let conversation_id = format!("{archive_name}|S{}|C{}", source.index, sharing.index);
            let tags = sharing
                .conversations
                .iter()
                .flat_map(|turn| turn.code_blocks.iter())
                .filter_map(|block| block.kind.as_deref().map(str::trim))
                .filter(|tag| !tag.is_empty());
            for tag in tags {
                *snippets.entry(tag.to_owned()).or_insert(0) += 1;
                conversations
                    .entry(tag.to_owned())
                    .or_default()
                    .insert(conversation_id.clone());
            }
        }
    }
}

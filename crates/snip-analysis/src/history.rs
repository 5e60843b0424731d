use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snip_hosting::{BlobLocation, SourceHost};

use crate::reuse::{Pacing, ReuseEntry};

/// Oldest and newest revision of an upstream file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionPair {
    pub url: String,
    pub initial_sha: String,
    pub final_sha: String,
    pub commits: usize,
    pub initial_code: String,
    pub final_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySkip {
    InvalidUrl,
    CommitListFailed,
    TooFewCommits,
    SameRevision,
    MissingContent,
}

impl HistorySkip {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::CommitListFailed => "commit_list_failed",
            Self::TooFewCommits => "too_few_commits",
            Self::SameRevision => "same_revision",
            Self::MissingContent => "missing_content",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRun {
    pub pairs: BTreeMap<String, RevisionPair>,
    pub skipped: BTreeMap<HistorySkip, usize>,
}

impl HistoryRun {
    fn skip(&mut self, snippet: &str, reason: HistorySkip) {
        tracing::debug!(snippet = %snippet, reason = reason.as_str(), "no revision pair");
        *self.skipped.entry(reason).or_insert(0) += 1;
    }
}

/// Collects the first and last revision for every reuse entry that carries a URL.
/// Entries without two distinct revisions with content are excluded, not zero-filled.
pub fn collect_revision_pairs(
    host: &dyn SourceHost,
    reuse: &BTreeMap<String, ReuseEntry>,
    pacing: Pacing,
    sleep: &mut dyn FnMut(Duration),
) -> HistoryRun {
    let mut run = HistoryRun::default();
    let with_url = reuse
        .iter()
        .filter_map(|(snippet, entry)| entry.url.as_deref().map(|url| (snippet, url)));

    for (index, (snippet, url)) in with_url.enumerate() {
        if pacing.should_pause(index) {
            sleep(pacing.pause);
        }

        let Some(location) = BlobLocation::parse(url) else {
            run.skip(snippet, HistorySkip::InvalidUrl);
            continue;
        };
        let commits = match host.commits_for_path(&location) {
            Ok(commits) => commits,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "failed to list commits");
                run.skip(snippet, HistorySkip::CommitListFailed);
                continue;
            }
        };
        let (Some(newest), Some(oldest)) = (commits.first(), commits.last()) else {
            run.skip(snippet, HistorySkip::TooFewCommits);
            continue;
        };
        if commits.len() < 2 {
            run.skip(snippet, HistorySkip::TooFewCommits);
            continue;
        }
        if newest.sha == oldest.sha {
            run.skip(snippet, HistorySkip::SameRevision);
            continue;
        }

        let initial = host.file_at_revision(&location, &oldest.sha);
        let latest = host.file_at_revision(&location, &newest.sha);
        let (Some(initial_code), Some(final_code)) = (initial.content, latest.content) else {
            run.skip(snippet, HistorySkip::MissingContent);
            continue;
        };

        run.pairs.insert(
            snippet.clone(),
            RevisionPair {
                url: url.to_owned(),
                initial_sha: oldest.sha.clone(),
                final_sha: newest.sha.clone(),
                commits: commits.len(),
                initial_code,
                final_code,
            },
        );
    }

    tracing::info!(
        pairs = run.pairs.len(),
        skipped = run.skipped.values().sum::<usize>(),
        "revision history collected"
    );
    run
}

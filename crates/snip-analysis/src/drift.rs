use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snip_core::{Diagnostic, Language, LinterKind};
use snip_lint::Linter;

use crate::AnalysisError;
use crate::history::RevisionPair;

/// Diagnostic identity across revisions: line plus message, or the code when
/// the message is blank. Unrelated edits that shift lines change identities.
pub fn issue_identity(diagnostic: &Diagnostic) -> (u32, String) {
    let label = if diagnostic.message.trim().is_empty() {
        diagnostic.code.clone()
    } else {
        diagnostic.message.clone()
    };
    (diagnostic.line, label)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftCounts {
    pub fixed: usize,
    pub introduced: usize,
    pub unchanged: usize,
}

impl DriftCounts {
    pub fn net_change(&self) -> i64 {
        self.fixed as i64 - self.introduced as i64
    }
}

pub fn compare_diagnostics(initial: &[Diagnostic], latest: &[Diagnostic]) -> DriftCounts {
    let before = initial.iter().map(issue_identity).collect::<BTreeSet<_>>();
    let after = latest.iter().map(issue_identity).collect::<BTreeSet<_>>();

    DriftCounts {
        fixed: before.difference(&after).count(),
        introduced: after.difference(&before).count(),
        unchanged: before.intersection(&after).count(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetDrift {
    pub url: String,
    pub language: Language,
    #[serde(flatten)]
    pub counts: DriftCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftRun {
    pub snippets: BTreeMap<String, SnippetDrift>,
    pub skipped: usize,
    /// Pairs whose revisions could not be written to scratch files.
    #[serde(default)]
    pub failed: usize,
}

/// Lints both ends of each revision pair and diffs the results.
pub struct DriftAnalyzer<'a> {
    linter: &'a dyn Linter,
    scratch_dir: Option<PathBuf>,
}

impl<'a> DriftAnalyzer<'a> {
    pub fn new(linter: &'a dyn Linter) -> Self {
        Self {
            linter,
            scratch_dir: None,
        }
    }

    /// Writes revision files under `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn analyze(&self, pairs: &BTreeMap<String, RevisionPair>) -> DriftRun {
        let mut run = DriftRun::default();
        for (snippet, pair) in pairs {
            match self.analyze_pair(pair) {
                Ok(Some(drift)) => {
                    run.snippets.insert(snippet.clone(), drift);
                }
                Ok(None) => run.skipped += 1,
                Err(err) => {
                    tracing::warn!(snippet = %snippet, error = %err, "drift analysis failed for pair");
                    run.failed += 1;
                }
            }
        }

        tracing::info!(
            analyzed = run.snippets.len(),
            skipped = run.skipped,
            failed = run.failed,
            "drift analysis finished"
        );
        run
    }

    /// `None` when either revision is blank or the file type has no linter.
    pub fn analyze_pair(&self, pair: &RevisionPair) -> Result<Option<SnippetDrift>, AnalysisError> {
        if pair.initial_code.trim().is_empty() || pair.final_code.trim().is_empty() {
            return Ok(None);
        }
        let Some(language) = Language::from_path(&pair.url) else {
            tracing::debug!(url = %pair.url, "no linter for upstream file type");
            return Ok(None);
        };
        let base_name = Path::new(&pair.url)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("upstream.{}", language.extension()));

        let mut builder = tempfile::Builder::new();
        builder.prefix("drift_");
        let workdir = match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };
        let initial_path = workdir.path().join(format!("initial_{base_name}"));
        let final_path = workdir.path().join(format!("final_{base_name}"));
        fs::write(&initial_path, &pair.initial_code)?;
        fs::write(&final_path, &pair.final_code)?;

        let tool = LinterKind::default_for(language);
        let initial = self.linter.lint_file(tool, &initial_path);
        let latest = self.linter.lint_file(tool, &final_path);

        Ok(Some(SnippetDrift {
            url: pair.url.clone(),
            language,
            counts: compare_diagnostics(&initial, &latest),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snip_core::Severity;

    fn diagnostic(line: u32, code: &str, message: &str) -> Diagnostic {
        Diagnostic {
            tool: LinterKind::Pylint,
            code: code.to_owned(),
            message: message.to_owned(),
            line,
            severity: Severity::Undefined,
            symbol: None,
        }
    }

    #[test]
    fn counts_fixed_introduced_and_unchanged() {
        let initial = vec![
            diagnostic(10, "W0612", "unused variable"),
            diagnostic(12, "E0001", "missing colon"),
        ];
        let latest = vec![
            diagnostic(12, "E0001", "missing colon"),
            diagnostic(20, "C0103", "bad name"),
        ];

        let counts = compare_diagnostics(&initial, &latest);

        assert_eq!(
            counts,
            DriftCounts {
                fixed: 1,
                introduced: 1,
                unchanged: 1
            }
        );
        assert_eq!(counts.net_change(), 0);
    }

    #[test]
    fn counts_partition_both_identity_sets() {
        let initial = vec![
            diagnostic(1, "W0611", "unused import os"),
            diagnostic(1, "W0611", "unused import os"),
            diagnostic(4, "E0602", ""),
            diagnostic(9, "C0301", "line too long"),
        ];
        let latest = vec![
            diagnostic(4, "E0602", ""),
            diagnostic(5, "C0301", "line too long"),
        ];

        let counts = compare_diagnostics(&initial, &latest);
        let before = initial.iter().map(issue_identity).collect::<BTreeSet<_>>();
        let after = latest.iter().map(issue_identity).collect::<BTreeSet<_>>();

        assert_eq!(counts.fixed + counts.unchanged, before.len());
        assert_eq!(counts.introduced + counts.unchanged, after.len());
        assert_eq!(counts.unchanged, 1);
    }

    #[test]
    fn blank_message_falls_back_to_code() {
        assert_eq!(
            issue_identity(&diagnostic(3, "no-undef", "  ")),
            (3, "no-undef".to_owned())
        );
    }
}

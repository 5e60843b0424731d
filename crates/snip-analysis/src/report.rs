use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use snip_core::{Language, LinterKind, Severity, conversation_of};
use snip_lint::{CategorySummary, LintReport};

use crate::drift::DriftRun;
use crate::output::CsvTable;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetDelta {
    pub snippet: String,
    pub fixed: usize,
    pub introduced: usize,
    pub unchanged: usize,
    pub net_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSummary {
    pub total_snippets: usize,
    pub total_fixed: usize,
    pub total_introduced: usize,
    pub total_unchanged: usize,
    pub avg_fixed_per_snippet: f64,
    pub avg_introduced_per_snippet: f64,
    pub avg_unchanged_per_snippet: f64,
    pub top_fixed_snippet: Option<SnippetDelta>,
    pub top_introduced_snippet: Option<SnippetDelta>,
    pub top_net_improvement_snippet: Option<SnippetDelta>,
}

pub fn snippet_deltas(run: &DriftRun) -> Vec<SnippetDelta> {
    run.snippets
        .iter()
        .map(|(snippet, drift)| SnippetDelta {
            snippet: snippet.clone(),
            fixed: drift.counts.fixed,
            introduced: drift.counts.introduced,
            unchanged: drift.counts.unchanged,
            net_change: drift.counts.net_change(),
        })
        .collect()
}

fn average(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// First snippet holding the maximum key.
fn first_max<K: Ord>(deltas: &[SnippetDelta], key: impl Fn(&SnippetDelta) -> K) -> Option<SnippetDelta> {
    let mut best: Option<&SnippetDelta> = None;
    for delta in deltas {
        if best.is_none_or(|current| key(delta) > key(current)) {
            best = Some(delta);
        }
    }
    best.cloned()
}

pub fn summarize_drift(run: &DriftRun) -> DriftSummary {
    let deltas = snippet_deltas(run);
    let total_snippets = deltas.len();
    let total_fixed = deltas.iter().map(|delta| delta.fixed).sum();
    let total_introduced = deltas.iter().map(|delta| delta.introduced).sum();
    let total_unchanged = deltas.iter().map(|delta| delta.unchanged).sum();

    DriftSummary {
        total_snippets,
        total_fixed,
        total_introduced,
        total_unchanged,
        avg_fixed_per_snippet: average(total_fixed, total_snippets),
        avg_introduced_per_snippet: average(total_introduced, total_snippets),
        avg_unchanged_per_snippet: average(total_unchanged, total_snippets),
        top_fixed_snippet: first_max(&deltas, |delta| delta.fixed),
        top_introduced_snippet: first_max(&deltas, |delta| delta.introduced),
        top_net_improvement_snippet: first_max(&deltas, |delta| delta.net_change),
    }
}

pub fn drift_table(run: &DriftRun) -> CsvTable {
    let mut table = CsvTable::new(&["snippet", "fixed", "introduced", "unchanged", "net_change"]);
    for delta in snippet_deltas(run) {
        table.push_row(vec![
            delta.snippet,
            delta.fixed.to_string(),
            delta.introduced.to_string(),
            delta.unchanged.to_string(),
            delta.net_change.to_string(),
        ]);
    }
    table
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDrift {
    pub language: Language,
    pub snippets: usize,
    pub total_fixed: usize,
    pub total_introduced: usize,
    pub total_unchanged: usize,
    pub avg_fixed: f64,
    pub avg_introduced: f64,
    pub avg_unchanged: f64,
}

/// One row per supported language, present even when it has no snippets.
pub fn summarize_drift_by_language(run: &DriftRun) -> Vec<LanguageDrift> {
    Language::ALL
        .into_iter()
        .map(|language| {
            let counts = run
                .snippets
                .values()
                .filter(|drift| drift.language == language)
                .map(|drift| drift.counts)
                .collect::<Vec<_>>();
            let snippets = counts.len();
            let total_fixed = counts.iter().map(|count| count.fixed).sum();
            let total_introduced = counts.iter().map(|count| count.introduced).sum();
            let total_unchanged = counts.iter().map(|count| count.unchanged).sum();
            LanguageDrift {
                language,
                snippets,
                total_fixed,
                total_introduced,
                total_unchanged,
                avg_fixed: average(total_fixed, snippets),
                avg_introduced: average(total_introduced, snippets),
                avg_unchanged: average(total_unchanged, snippets),
            }
        })
        .collect()
}

pub fn language_table(rows: &[LanguageDrift]) -> CsvTable {
    let mut table = CsvTable::new(&[
        "Language",
        "Snippets",
        "Total Fixed",
        "Total Introduced",
        "Total Unchanged",
        "Avg Fixed",
        "Avg Introduced",
        "Avg Unchanged",
    ]);
    for row in rows {
        table.push_row(vec![
            row.language.display_name().to_owned(),
            row.snippets.to_string(),
            row.total_fixed.to_string(),
            row.total_introduced.to_string(),
            row.total_unchanged.to_string(),
            row.avg_fixed.to_string(),
            row.avg_introduced.to_string(),
            row.avg_unchanged.to_string(),
        ]);
    }
    table
}

pub fn category_table(summaries: &[CategorySummary]) -> CsvTable {
    let mut table = CsvTable::new(&[
        "Category",
        "Total Issues",
        "Conversations Affected",
        "Files Affected",
        "Top Rules",
    ]);
    for summary in summaries {
        let top_rules = summary
            .top_codes
            .iter()
            .map(|code| format!("{} ({})", code.code, code.count))
            .collect::<Vec<_>>()
            .join(", ");
        table.push_row(vec![
            summary.category.label().to_owned(),
            summary.total_issues.to_string(),
            summary.conversations_affected.to_string(),
            summary.files_affected.to_string(),
            top_rules,
        ]);
    }
    table
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityRow {
    pub severity: Severity,
    pub total_issues: usize,
    pub files_affected: usize,
    pub conversations_affected: usize,
}

/// Bandit findings grouped by severity; severities without findings are omitted.
pub fn severity_rows(report: &LintReport) -> Vec<SeverityRow> {
    let mut totals: BTreeMap<Severity, (usize, BTreeSet<&str>, BTreeSet<String>)> = BTreeMap::new();
    for (path, diagnostics) in report {
        for diagnostic in diagnostics.iter().filter(|d| d.tool == LinterKind::Bandit) {
            let entry = totals.entry(diagnostic.severity).or_default();
            entry.0 += 1;
            entry.1.insert(path.as_str());
            entry.2.insert(conversation_of(path));
        }
    }

    Severity::ALL
        .into_iter()
        .filter_map(|severity| {
            let (total, files, conversations) = totals.remove(&severity)?;
            Some(SeverityRow {
                severity,
                total_issues: total,
                files_affected: files.len(),
                conversations_affected: conversations.len(),
            })
        })
        .collect()
}

pub fn severity_table(rows: &[SeverityRow]) -> CsvTable {
    let mut table = CsvTable::new(&[
        "Severity",
        "Total Issues",
        "Files Affected",
        "Conversations Affected",
    ]);
    for row in rows {
        table.push_row(vec![
            row.severity.as_str().to_owned(),
            row.total_issues.to_string(),
            row.files_affected.to_string(),
            row.conversations_affected.to_string(),
        ]);
    }
    table
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityRule {
    pub code: String,
    pub occurrences: usize,
    pub severity: Severity,
    pub description: String,
}

/// Most frequent bandit rules with the first-seen severity and description.
pub fn top_severity_rules(report: &LintReport, top_n: usize) -> Vec<SeverityRule> {
    let mut rules: BTreeMap<&str, SeverityRule> = BTreeMap::new();
    for diagnostic in report
        .values()
        .flatten()
        .filter(|diagnostic| diagnostic.tool == LinterKind::Bandit)
    {
        rules
            .entry(diagnostic.code.as_str())
            .or_insert_with(|| SeverityRule {
                code: diagnostic.code.clone(),
                occurrences: 0,
                severity: diagnostic.severity,
                description: diagnostic.message.clone(),
            })
            .occurrences += 1;
    }

    let mut ranked = rules.into_values().collect::<Vec<_>>();
    ranked.sort_by(|left, right| {
        right
            .occurrences
            .cmp(&left.occurrences)
            .then_with(|| left.code.cmp(&right.code))
    });
    ranked.truncate(top_n);
    ranked
}

pub fn top_rules_table(rules: &[SeverityRule]) -> CsvTable {
    let mut table = CsvTable::new(&["Bandit Rule", "Occurrences", "Severity", "Description"]);
    for rule in rules {
        table.push_row(vec![
            rule.code.clone(),
            rule.occurrences.to_string(),
            rule.severity.as_str().to_owned(),
            rule.description.clone(),
        ]);
    }
    table
}

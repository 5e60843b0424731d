use std::io::Write;

use anyhow::{Context, Result};
use snip_analysis::{
    DriftAnalyzer, DriftRun, HistoryRun, drift_table, language_table, read_json, summarize_drift,
    summarize_drift_by_language, write_json,
};
use snip_lint::LintRunner;

use super::{Workspace, require_input};
use crate::cli::{DriftArgs, ReportArgs};

pub fn run_drift(workspace: &Workspace, args: &DriftArgs, out: &mut dyn Write) -> Result<()> {
    let history_path = workspace.resolve(&args.history);
    require_input(&history_path)?;
    let history: HistoryRun = read_json(&history_path)?;

    let runner = LintRunner::new(&workspace.config().lint)?;
    let run = DriftAnalyzer::new(&runner).analyze(&history.pairs);

    let output = workspace.resolve(&args.output);
    write_json(&output, &run).with_context(|| format!("failed to write {}", output.display()))?;

    writeln!(out, "Snippets analyzed: {}", run.snippets.len())?;
    writeln!(out, "Snippets skipped: {}", run.skipped)?;
    writeln!(out, "Snippets failed: {}", run.failed)?;
    Ok(())
}

pub fn run_report(workspace: &Workspace, args: &ReportArgs, out: &mut dyn Write) -> Result<()> {
    let drift_path = workspace.resolve(&args.drift);
    require_input(&drift_path)?;
    let run: DriftRun = read_json(&drift_path)?;

    let summary = summarize_drift(&run);
    let languages = summarize_drift_by_language(&run);
    let output = workspace.resolve(&args.output);
    write_json(&output.join("drift_summary.json"), &summary)?;
    drift_table(&run).write(&output.join("drift_summary.csv"))?;
    let by_language = languages
        .iter()
        .map(|row| (row.language.as_str(), row))
        .collect::<std::collections::BTreeMap<_, _>>();
    write_json(&output.join("drift_by_language.json"), &by_language)?;
    language_table(&languages).write(&output.join("drift_by_language.csv"))?;

    writeln!(out, "Total snippets: {}", summary.total_snippets)?;
    writeln!(
        out,
        "Fixed: {} (avg {:.2})",
        summary.total_fixed, summary.avg_fixed_per_snippet
    )?;
    writeln!(
        out,
        "Introduced: {} (avg {:.2})",
        summary.total_introduced, summary.avg_introduced_per_snippet
    )?;
    writeln!(
        out,
        "Unchanged: {} (avg {:.2})",
        summary.total_unchanged, summary.avg_unchanged_per_snippet
    )?;
    if let Some(top) = &summary.top_net_improvement_snippet {
        writeln!(out, "Largest net improvement: {} ({:+})", top.snippet, top.net_change)?;
    }
    for row in &languages {
        writeln!(
            out,
            "{}: {} snippets, {} fixed, {} introduced, {} unchanged",
            row.language.display_name(),
            row.snippets,
            row.total_fixed,
            row.total_introduced,
            row.total_unchanged
        )?;
    }
    Ok(())
}

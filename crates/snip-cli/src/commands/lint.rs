use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use snip_analysis::{
    accepted_list_name, category_table, read_json, read_path_list, severity_rows, severity_table,
    top_rules_table, top_severity_rules, write_json,
};
use snip_core::LinterKind;
use snip_lint::{
    Categorizer, LintReport, LintRunner, RuleCatalog, lint_paths, summarize_by_category,
};

use super::{Workspace, require_input};
use crate::cli::{CategorizeArgs, LintArgs, RulesArgs, SeverityArgs};

fn default_report_path(tool: LinterKind) -> PathBuf {
    PathBuf::from(format!("results/lint_{}.json", tool.as_str()))
}

pub fn run_rules(workspace: &Workspace, args: &RulesArgs, out: &mut dyn Write) -> Result<()> {
    let runner = LintRunner::new(&workspace.config().lint)?;
    let messages = runner
        .pylint_messages()
        .context("failed to list pylint messages")?;
    let catalog = RuleCatalog::from_pylint_messages(&messages);
    if catalog.is_empty() {
        tracing::warn!("pylint --list-msgs produced no rule entries");
    }

    let output = workspace.resolve(&args.output);
    catalog
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    writeln!(out, "Rules catalogued: {}", catalog.len())?;
    for (category, count) in catalog.count_by_category() {
        writeln!(out, "  {}: {count}", category.label())?;
    }
    Ok(())
}

pub fn run_lint(workspace: &Workspace, args: &LintArgs, out: &mut dyn Write) -> Result<()> {
    let list = match &args.list {
        Some(list) => workspace.resolve(list),
        None => workspace
            .resolve(&PathBuf::from("results/classification"))
            .join(accepted_list_name(args.tool.language())),
    };
    require_input(&list)?;
    let paths = read_path_list(&list)?
        .into_iter()
        .map(|path| workspace.resolve(&PathBuf::from(path)).to_string_lossy().into_owned())
        .collect::<Vec<_>>();

    let mut lint_config = workspace.config().lint.clone();
    if let Some(timeout_secs) = args.timeout_secs {
        lint_config.timeout_secs = timeout_secs;
    }
    let runner = LintRunner::new(&lint_config)?;

    tracing::info!(tool = args.tool.as_str(), files = paths.len(), "linting snippets");
    let report = lint_paths(&runner, args.tool, &paths);

    let output = workspace.resolve(args.output.as_ref().unwrap_or(&default_report_path(args.tool)));
    write_json(&output, &report).with_context(|| format!("failed to write {}", output.display()))?;

    let with_issues = report.values().filter(|issues| !issues.is_empty()).count();
    let total = report.values().map(Vec::len).sum::<usize>();
    writeln!(out, "Files linted with {}: {}", args.tool.as_str(), report.len())?;
    writeln!(out, "Files with issues: {with_issues}")?;
    writeln!(out, "Total issues: {total}")?;
    Ok(())
}

pub fn run_categorize(workspace: &Workspace, args: &CategorizeArgs, out: &mut dyn Write) -> Result<()> {
    let input = workspace.resolve(args.input.as_ref().unwrap_or(&default_report_path(args.tool)));
    require_input(&input)?;
    let report: LintReport = read_json(&input)?;

    let mut categorizer = Categorizer::new();
    let catalog_path = workspace.resolve(&args.catalog);
    if args.tool == LinterKind::Pylint && catalog_path.is_file() {
        let catalog = RuleCatalog::load(&catalog_path)
            .with_context(|| format!("failed to load rule catalog {}", catalog_path.display()))?;
        tracing::info!(rules = catalog.len(), "using pylint rule catalog");
        categorizer = categorizer.with_catalog(catalog);
    }

    let summaries = summarize_by_category(
        &report,
        &mut categorizer,
        workspace.config().report.top_rules,
    );
    let output = workspace.resolve(&args.output);
    let tool = args.tool.as_str();
    write_json(&output.join(format!("{tool}_categories.json")), &summaries)?;
    category_table(&summaries).write(&output.join(format!("{tool}_category_summary.csv")))?;

    for summary in &summaries {
        writeln!(out, "{}:", summary.category.label())?;
        writeln!(out, " - Total Issues: {}", summary.total_issues)?;
        writeln!(out, " - Conversations Affected: {}", summary.conversations_affected)?;
        writeln!(out, " - Files Affected: {}", summary.files_affected)?;
        for code in &summary.top_codes {
            writeln!(out, "   - {}: {} times", code.code, code.count)?;
        }
    }
    Ok(())
}

pub fn run_severity(workspace: &Workspace, args: &SeverityArgs, out: &mut dyn Write) -> Result<()> {
    let input = workspace.resolve(&args.input);
    require_input(&input)?;
    let report: LintReport = read_json(&input)?;

    let rows = severity_rows(&report);
    let rules = top_severity_rules(&report, workspace.config().report.top_issues);
    let output = workspace.resolve(&args.output);
    severity_table(&rows).write(&output.join("bandit_severity_summary.csv"))?;
    top_rules_table(&rules).write(&output.join("bandit_top_issues.csv"))?;

    writeln!(out, "{:<10} {:>8} {:>8} {:>14}", "Severity", "Issues", "Files", "Conversations")?;
    for row in &rows {
        writeln!(
            out,
            "{:<10} {:>8} {:>8} {:>14}",
            row.severity.as_str(),
            row.total_issues,
            row.files_affected,
            row.conversations_affected
        )?;
    }
    writeln!(out, "Most frequent rules:")?;
    for rule in &rules {
        writeln!(
            out,
            "  {} x{} [{}] {}",
            rule.code,
            rule.occurrences,
            rule.severity.as_str(),
            rule.description
        )?;
    }
    Ok(())
}

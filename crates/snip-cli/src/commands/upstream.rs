use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use snip_analysis::{
    AnalysisError, HistoryRun, Pacing, ProvenanceMapping, ReuseRun, UpstreamIndex,
    accepted_list_name, archive_files, collect_revision_pairs, compare_reuse, lint_upstream,
    match_snippets, read_json, read_path_list, retain_source_urls, write_json,
    write_provenance_outputs,
};
use snip_core::{Language, load_archive};
use snip_hosting::{GitHubClient, load_token};
use snip_lint::LintRunner;

use super::{Workspace, require_input};
use crate::cli::{FetchArgs, HistoryArgs, LintUpstreamArgs, MatchArgs};

pub fn run_match(workspace: &Workspace, args: &MatchArgs, out: &mut dyn Write) -> Result<()> {
    let archives = workspace.resolve(&args.archives);
    require_input(&archives)?;

    let lists = if args.lists.is_empty() {
        Language::ALL
            .into_iter()
            .map(|language| {
                workspace
                    .resolve(&PathBuf::from("results/classification"))
                    .join(accepted_list_name(language))
            })
            .collect::<Vec<_>>()
    } else {
        args.lists.iter().map(|list| workspace.resolve(list)).collect()
    };
    let mut seen = BTreeSet::new();
    let mut snippets = Vec::new();
    for list in &lists {
        require_input(list)?;
        for path in read_path_list(list)? {
            if seen.insert(path.clone()) {
                snippets.push(path);
            }
        }
    }

    let mut matching = workspace.config().matching.clone();
    if let Some(threshold) = args.threshold {
        matching.threshold = threshold;
    }

    let mut index = UpstreamIndex::default();
    for archive_path in archive_files(&archives)? {
        let archive = load_archive(&archive_path).map_err(|source| AnalysisError::Archive {
            path: archive_path.clone(),
            source,
        })?;
        index.add_archive(&archive, &matching.translations);
    }
    tracing::info!(titles = index.len(), snippets = snippets.len(), "matching snippets to upstream titles");

    let mut run = match_snippets(&snippets, &index, &matching);
    let exact = run.exact_matches();
    let fuzzy = run.fuzzy_matches();
    let dropped = if args.source_files_only {
        retain_source_urls(&mut run.mappings)
    } else {
        0
    };
    let output = workspace.resolve(&args.output);
    let outputs = write_provenance_outputs(&run, &output)
        .with_context(|| format!("failed to write provenance outputs to {}", output.display()))?;

    writeln!(out, "Snippets considered: {}", snippets.len())?;
    writeln!(out, "Exact title matches: {exact}")?;
    writeln!(out, "Fuzzy title matches: {fuzzy}")?;
    if args.source_files_only {
        writeln!(out, "Mappings dropped as non-source URLs: {dropped}")?;
    }
    writeln!(out, "Unmapped snippets: {}", run.unmapped.len())?;
    writeln!(out, "Unmatched upstream titles: {}", run.unmatched_upstream.len())?;
    writeln!(out, "Mappings written to {}", outputs.mappings.display())?;
    Ok(())
}

/// Loads the API token and checks it before any batch request.
fn connect(workspace: &Workspace) -> Result<GitHubClient> {
    let hosting = &workspace.config().hosting;
    let token = load_token(hosting, workspace.root(), |name| std::env::var(name).ok())
        .context("hosting API credentials are required for this command")?;
    let client = GitHubClient::new(hosting, token).context("failed to build HTTP client")?;

    let login = client.validate_token().context("API token was rejected")?;
    tracing::info!(login = %login, "authenticated with hosting API");
    match client.rate_limit() {
        Ok(limit) => tracing::info!(
            remaining = limit.remaining,
            limit = limit.limit,
            reset = limit.reset,
            "hosting API quota"
        ),
        Err(err) => tracing::warn!(error = %err, "could not read hosting API quota"),
    }
    Ok(client)
}

fn print_tallies<K: std::fmt::Display>(out: &mut dyn Write, tallies: impl IntoIterator<Item = (K, usize)>) -> Result<()> {
    for (key, count) in tallies {
        writeln!(out, "  {key}: {count}")?;
    }
    Ok(())
}

pub fn run_fetch(workspace: &Workspace, args: &FetchArgs, out: &mut dyn Write) -> Result<()> {
    let mappings_path = workspace.resolve(&args.mappings);
    require_input(&mappings_path)?;
    let mappings: BTreeMap<String, ProvenanceMapping> = read_json(&mappings_path)?;
    let client = connect(workspace)?;

    let threshold = args
        .threshold
        .unwrap_or(workspace.config().matching.similarity_threshold)
        .clamp(0.0, 1.0);
    let pacing = Pacing::from_config(&workspace.config().hosting);
    let snippets_root = workspace.resolve(&args.snippets);
    let run = compare_reuse(
        &client,
        &mappings,
        &snippets_root,
        threshold,
        pacing,
        &mut std::thread::sleep,
    );

    let output = workspace.resolve(&args.output);
    write_json(&output, &run).with_context(|| format!("failed to write {}", output.display()))?;

    writeln!(out, "Mappings compared: {}", run.entries.len())?;
    print_tallies(out, run.tallies.iter().map(|(key, count)| (key, *count)))?;
    Ok(())
}

pub fn run_history(workspace: &Workspace, args: &HistoryArgs, out: &mut dyn Write) -> Result<()> {
    let reuse_path = workspace.resolve(&args.reuse);
    require_input(&reuse_path)?;
    let reuse: ReuseRun = read_json(&reuse_path)?;
    let client = connect(workspace)?;

    let pacing = Pacing::from_config(&workspace.config().hosting);
    let run: HistoryRun =
        collect_revision_pairs(&client, &reuse.entries, pacing, &mut std::thread::sleep);

    let output = workspace.resolve(&args.output);
    write_json(&output, &run).with_context(|| format!("failed to write {}", output.display()))?;

    writeln!(out, "Revision pairs collected: {}", run.pairs.len())?;
    print_tallies(
        out,
        run.skipped.iter().map(|(reason, count)| (reason.as_str(), *count)),
    )?;
    Ok(())
}

pub fn run_lint_upstream(workspace: &Workspace, args: &LintUpstreamArgs, out: &mut dyn Write) -> Result<()> {
    let reuse_path = workspace.resolve(&args.reuse);
    require_input(&reuse_path)?;
    let reuse: ReuseRun = read_json(&reuse_path)?;

    let runner = LintRunner::new(&workspace.config().lint)?;
    let report = lint_upstream(&runner, &reuse.entries, workspace.config().report.top_issues, None);

    let output = workspace.resolve(&args.output);
    write_json(&output, &report).with_context(|| format!("failed to write {}", output.display()))?;

    writeln!(out, "Upstream files linted: {}", report.entries.len())?;
    writeln!(out, "Skipped as non-source: {}", report.skipped)?;
    writeln!(out, "Failed to stage for linting: {}", report.failed)?;
    for (language, codes) in &report.top_codes {
        writeln!(out, "{} top issues:", language.display_name())?;
        for code in codes {
            writeln!(out, "  {}: {} ({})", code.code, code.count, code.description)?;
        }
    }
    Ok(())
}

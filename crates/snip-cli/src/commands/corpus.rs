use std::io::Write;

use anyhow::{Context, Result};
use snip_analysis::{
    census_directory, classify_corpus, extract_directory, render_summary, write_classification_outputs,
    write_json,
};
use snip_core::Language;
use snip_parse::SnippetClassifier;

use super::{Workspace, require_input};
use crate::cli::{ClassifyArgs, ExtractArgs, InventoryArgs};

pub fn run_extract(workspace: &Workspace, args: &ExtractArgs, out: &mut dyn Write) -> Result<()> {
    let archives = workspace.resolve(&args.archives);
    let output = workspace.resolve(&args.output);
    require_input(&archives)?;

    let report = extract_directory(&archives, &output)
        .with_context(|| format!("failed to extract snippets from {}", archives.display()))?;
    let report_path = workspace.resolve(&args.report);
    write_json(&report_path, &report)
        .with_context(|| format!("failed to write {}", report_path.display()))?;

    writeln!(out, "Archives processed: {}", report.archives)?;
    for language in Language::ALL {
        writeln!(
            out,
            "{} blocks detected: {}",
            language.display_name(),
            report.detected.get(&language).copied().unwrap_or(0)
        )?;
    }
    writeln!(out, "Snippets saved: {}", report.saved)?;
    writeln!(out, "Empty blocks skipped: {}", report.skipped_empty)?;
    writeln!(out, "Malformed entries skipped: {}", report.malformed)?;
    if !report.unknown_tags.is_empty() {
        let tags = report.unknown_tags.iter().cloned().collect::<Vec<_>>();
        writeln!(out, "Other language tags: {}", tags.join(", "))?;
    }
    Ok(())
}

pub fn run_inventory(workspace: &Workspace, args: &InventoryArgs, out: &mut dyn Write) -> Result<()> {
    let archives = workspace.resolve(&args.archives);
    require_input(&archives)?;

    let census = census_directory(&archives)
        .with_context(|| format!("failed to read archives in {}", archives.display()))?;
    let output = workspace.resolve(&args.output);
    write_json(&output, &census).with_context(|| format!("failed to write {}", output.display()))?;

    writeln!(out, "{:<24} {:>10} {:>14}", "Language", "Snippets", "Conversations")?;
    for entry in &census {
        writeln!(
            out,
            "{:<24} {:>10} {:>14}",
            entry.language, entry.snippets, entry.conversations
        )?;
    }
    Ok(())
}

pub fn run_classify(workspace: &Workspace, args: &ClassifyArgs, out: &mut dyn Write) -> Result<()> {
    let snippets = workspace.resolve(&args.snippets);
    require_input(&snippets)?;

    let mut classifier = SnippetClassifier::new().context("failed to load grammars")?;
    let result = classify_corpus(&mut classifier, &snippets)
        .with_context(|| format!("failed to classify {}", snippets.display()))?;
    let output = workspace.resolve(&args.output);
    let outputs = write_classification_outputs(&result, &output)
        .with_context(|| format!("failed to write classification outputs to {}", output.display()))?;

    write!(out, "{}", render_summary(&result))?;
    for (language, path) in &outputs.accepted {
        writeln!(out, "Accepted {} list: {}", language.display_name(), path.display())?;
    }
    Ok(())
}

use snip_config::LintConfig;
use snip_core::{IssueCategory, LinterKind};
use snip_lint::{
    Categorizer, LintReport, NoiseFilter, RuleCatalog, parse_tool_output, summarize_by_category,
};

const PYLINT_OUTPUT: &str = r#"[
    {"type": "error", "line": 1, "message-id": "E0401", "symbol": "import-error",
     "message": "Unable to import 'pandas'"},
    {"type": "convention", "line": 1, "message-id": "C0114", "symbol": "missing-module-docstring",
     "message": "Missing module docstring"},
    {"type": "warning", "line": 4, "message-id": "W0123", "symbol": "eval-used",
     "message": "Use of eval"},
    {"type": "warning", "line": 6, "message-id": "W0612", "symbol": "unused-variable",
     "message": "Unused variable 'frame'"}
]"#;

#[test]
fn pandas_import_error_is_filtered_before_categorization() {
    let filter = NoiseFilter::from_config(&LintConfig::default());
    let diagnostics = parse_tool_output(LinterKind::Pylint, PYLINT_OUTPUT).expect("parse");
    let kept = filter.retain(diagnostics);

    assert!(kept.iter().all(|diagnostic| diagnostic.code != "E0401"));
    assert!(kept.iter().all(|diagnostic| diagnostic.code != "C0114"));
    assert_eq!(kept.len(), 2);

    let mut report = LintReport::new();
    report.insert("snippets/Load_Frame/snippet_0_0_1.py".to_owned(), kept);

    let mut categorizer = Categorizer::new();
    let summary = summarize_by_category(&report, &mut categorizer, 5);
    let by_category = summary
        .iter()
        .map(|entry| (entry.category, entry.total_issues))
        .collect::<std::collections::BTreeMap<_, _>>();

    assert_eq!(by_category[&IssueCategory::CodeVulnerability], 1);
    assert_eq!(by_category[&IssueCategory::PotentialBug], 1);
    assert_eq!(by_category[&IssueCategory::CodeStyle], 0);
}

#[test]
fn catalog_descriptions_take_precedence_over_symbols() {
    let catalog = RuleCatalog::from_pylint_messages(
        ":exec-used (W0122): *Use of exec*\n:unused-import (W0611): *Unused %s*\n",
    );
    let mut categorizer = Categorizer::new().with_catalog(catalog);

    assert_eq!(
        categorizer.categorize(LinterKind::Pylint, "W0122", Some("builtin-call")),
        IssueCategory::CodeVulnerability
    );
    assert_eq!(
        categorizer.categorize(LinterKind::Pylint, "W0611", Some("unused-import")),
        IssueCategory::PotentialBug
    );
    assert_eq!(
        categorizer.categorize(LinterKind::Pylint, "W1510", Some("subprocess-run-check")),
        IssueCategory::PotentialBug
    );
}

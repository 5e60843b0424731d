use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;

use snip_analysis::{
    DriftAnalyzer, HistorySkip, MatchKind, Pacing, ProvenanceMapping, ReuseStatus,
    collect_revision_pairs, compare_reuse, lint_upstream, summarize_drift,
};
use snip_core::{Diagnostic, LinterKind, Severity};
use snip_hosting::{BlobLocation, CommitRef, FetchOutcome, FetchStatus, HostingError, SourceHost};
use snip_lint::Linter;

#[derive(Default)]
struct FakeHost {
    files: HashMap<String, String>,
    revisions: HashMap<(String, String), String>,
    commits: HashMap<String, Vec<&'static str>>,
    fetches: Cell<usize>,
}

impl SourceHost for FakeHost {
    fn fetch_file(&self, location: &BlobLocation) -> FetchOutcome {
        self.fetches.set(self.fetches.get() + 1);
        match self.files.get(&location.path) {
            Some(content) => FetchOutcome::success(content.clone()),
            None => FetchOutcome::failed(FetchStatus::FileNotFound, Some(404)),
        }
    }

    fn file_at_revision(&self, location: &BlobLocation, sha: &str) -> FetchOutcome {
        match self.revisions.get(&(location.path.clone(), sha.to_owned())) {
            Some(content) => FetchOutcome::success(content.clone()),
            None => FetchOutcome::failed(FetchStatus::EmptyContent, Some(200)),
        }
    }

    fn commits_for_path(&self, location: &BlobLocation) -> Result<Vec<CommitRef>, HostingError> {
        match self.commits.get(&location.path) {
            Some(shas) => Ok(shas
                .iter()
                .map(|sha| CommitRef {
                    sha: (*sha).to_owned(),
                })
                .collect()),
            None => Err(HostingError::Status {
                status: 500,
                url: location.to_string(),
            }),
        }
    }
}

/// Reports one diagnostic per line containing `BAD`.
struct MarkerLinter;

impl Linter for MarkerLinter {
    fn lint_file(&self, tool: LinterKind, path: &Path) -> Vec<Diagnostic> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains("BAD"))
            .map(|(index, line)| Diagnostic {
                tool,
                code: "X0001".to_owned(),
                message: line.trim().to_owned(),
                line: index as u32 + 1,
                severity: Severity::Undefined,
                symbol: None,
            })
            .collect()
    }
}

fn mapping(url: &str) -> ProvenanceMapping {
    ProvenanceMapping {
        url: url.to_owned(),
        match_kind: MatchKind::Exact,
        score: 1.0,
        conversation: "Conv".to_owned(),
        upstream_title: "conv".to_owned(),
    }
}

const UTILS_URL: &str = "https://github.com/acme/tools/blob/main/src/utils.py";
const GONE_URL: &str = "https://github.com/acme/tools/blob/main/src/gone.py";
const WIDGET_URL: &str = "https://github.com/acme/web/blob/main/widget.js";

fn host() -> FakeHost {
    let mut host = FakeHost::default();
    host.files.insert(
        "src/utils.py".to_owned(),
        "def helper():\n    return 1\n".to_owned(),
    );
    host.files.insert(
        "widget.js".to_owned(),
        "function render() {\n  return 1;\n}\n".to_owned(),
    );
    host.commits
        .insert("src/utils.py".to_owned(), vec!["c3", "c2", "c1"]);
    host.commits.insert("widget.js".to_owned(), vec!["w1"]);
    host.revisions.insert(
        ("src/utils.py".to_owned(), "c1".to_owned()),
        "x = 1  # BAD one\ny = 2  # BAD two\n".to_owned(),
    );
    host.revisions.insert(
        ("src/utils.py".to_owned(), "c3".to_owned()),
        "x = 1  # BAD one\ny = 2\nz = 3  # BAD three\n".to_owned(),
    );
    host
}

#[test]
fn reuse_history_and_drift_chain_together() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    std::fs::create_dir_all(root.join("Conv")).expect("mkdir");
    std::fs::write(
        root.join("Conv/snippet_0_0_1.py"),
        "def helper():\n    return 1\n",
    )
    .expect("write");

    let mut mappings = BTreeMap::new();
    mappings.insert("Conv/snippet_0_0_1.py".to_owned(), mapping(UTILS_URL));
    mappings.insert("Conv/snippet_0_0_2.py".to_owned(), mapping(GONE_URL));
    mappings.insert("Conv/snippet_0_0_3.js".to_owned(), mapping(WIDGET_URL));
    mappings.insert("Conv/snippet_0_0_4.py".to_owned(), mapping(""));
    mappings.insert("Conv/snippet_0_0_5.py".to_owned(), mapping("not a url"));

    let host = host();
    let mut pauses = Vec::new();
    let pacing = Pacing {
        every: 2,
        pause: Duration::from_secs(2),
    };
    let reuse = compare_reuse(&host, &mappings, root, 0.8, pacing, &mut |pause| {
        pauses.push(pause)
    });

    assert_eq!(reuse.entries.len(), 5);
    assert_eq!(reuse.entries["Conv/snippet_0_0_1.py"].status, ReuseStatus::Exact);
    assert_eq!(
        reuse.entries["Conv/snippet_0_0_2.py"].status,
        ReuseStatus::FetchFailed
    );
    let missing = &reuse.entries["Conv/snippet_0_0_3.js"];
    assert_eq!(missing.status, ReuseStatus::OriginalMissing);
    assert!(missing.fetched_code.as_deref().is_some_and(|code| code.contains("render")));
    assert_eq!(reuse.entries["Conv/snippet_0_0_4.py"].status, ReuseStatus::NoUrl);
    assert_eq!(reuse.tallies["fetch_failed_file_not_found"], 1);
    assert_eq!(reuse.tallies["fetch_failed_invalid_url"], 1);
    assert_eq!(pauses.len(), 2);
    assert_eq!(host.fetches.get(), 3);

    let history = collect_revision_pairs(&host, &reuse.entries, Pacing::none(), &mut |_| {});

    assert_eq!(history.pairs.len(), 1);
    let pair = &history.pairs["Conv/snippet_0_0_1.py"];
    assert_eq!(pair.initial_sha, "c1");
    assert_eq!(pair.final_sha, "c3");
    assert_eq!(pair.commits, 3);
    assert_eq!(history.skipped[&HistorySkip::TooFewCommits], 1);
    assert_eq!(history.skipped[&HistorySkip::CommitListFailed], 1);
    assert_eq!(history.skipped[&HistorySkip::InvalidUrl], 1);

    let linter = MarkerLinter;
    let drift = DriftAnalyzer::new(&linter).analyze(&history.pairs);
    let counts = drift.snippets["Conv/snippet_0_0_1.py"].counts;

    assert_eq!(counts.fixed, 1);
    assert_eq!(counts.introduced, 1);
    assert_eq!(counts.unchanged, 1);

    let summary = summarize_drift(&drift);
    assert_eq!(summary.total_snippets, 1);
    assert_eq!(summary.total_unchanged, 1);
}

#[test]
fn upstream_lint_only_covers_source_like_missing_originals() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut host = host();
    host.files.insert(
        "widget.js".to_owned(),
        "// widget\nconst a = 1; // BAD a\nconst b = 2;\nfunction render() {\n  return a + b;\n}\nrender();\n"
            .to_owned(),
    );
    host.files.insert("src/gone.py".to_owned(), "x = 1\n".to_owned());

    let mut mappings = BTreeMap::new();
    mappings.insert("Conv/snippet_0_0_2.py".to_owned(), mapping(GONE_URL));
    mappings.insert("Conv/snippet_0_0_3.js".to_owned(), mapping(WIDGET_URL));
    let reuse = compare_reuse(&host, &mappings, temp.path(), 0.8, Pacing::none(), &mut |_| {});

    let report = lint_upstream(&MarkerLinter, &reuse.entries, 5, None);

    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.entries.len(), 1);
    let widget = &report.entries["Conv/snippet_0_0_3.js"];
    assert_eq!(widget.diagnostics.len(), 1);
    assert_eq!(widget.diagnostics[0].tool, LinterKind::Eslint);
    let top = &report.top_codes[&snip_core::Language::JavaScript];
    assert_eq!(top[0].code, "X0001");
}

#[test]
fn scratch_write_failures_are_counted_per_item() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing_dir = temp.path().join("no-such-dir");
    let host = host();

    let mut mappings = BTreeMap::new();
    mappings.insert("Conv/snippet_0_0_1.py".to_owned(), mapping(UTILS_URL));
    let reuse = compare_reuse(&host, &mappings, temp.path(), 0.8, Pacing::none(), &mut |_| {});
    let history = collect_revision_pairs(&host, &reuse.entries, Pacing::none(), &mut |_| {});
    assert_eq!(history.pairs.len(), 1);

    let drift = DriftAnalyzer::new(&MarkerLinter)
        .with_scratch_dir(&missing_dir)
        .analyze(&history.pairs);
    assert_eq!(drift.failed, 1);
    assert!(drift.snippets.is_empty());

    let mut widget_host = host;
    widget_host.files.insert(
        "widget.js".to_owned(),
        "// widget\nconst a = 1;\nconst b = 2;\nfunction render() {\n  return a + b;\n}\nrender();\n"
            .to_owned(),
    );
    let mut widget_mappings = BTreeMap::new();
    widget_mappings.insert("Conv/snippet_0_0_3.js".to_owned(), mapping(WIDGET_URL));
    let reuse = compare_reuse(
        &widget_host,
        &widget_mappings,
        temp.path(),
        0.8,
        Pacing::none(),
        &mut |_| {},
    );

    let report = lint_upstream(&MarkerLinter, &reuse.entries, 5, Some(&missing_dir));
    assert_eq!(report.failed, 1);
    assert!(report.entries.is_empty());

    let report = lint_upstream(&MarkerLinter, &reuse.entries, 5, Some(temp.path()));
    assert_eq!(report.failed, 0);
    assert_eq!(report.entries.len(), 1);
}

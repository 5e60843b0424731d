use std::fs;

use clap::Parser;
use snip_cli::cli::Cli;
use snip_cli::commands::{Workspace, run_command};
use snip_config::SnipConfig;

const ARCHIVE: &str = r#"{
    "Sources": [
        {
            "URL": "https://github.com/acme/tools/blob/main/src/csv_tools.py",
            "ChatgptSharing": [
                {
                    "Title": "Parse CSV rows (Python)",
                    "Conversations": [
                        {"ListOfCode": [
                            {"Type": "python", "Content": "def parse(line):\n    return line.split(',')\n"},
                            {"Type": "python", "Content": "import csv\n"},
                            {"Type": "bash", "Content": "pip install csv"}
                        ]}
                    ]
                }
            ]
        },
        {
            "URL": "https://github.com/acme/web/blob/main/README.md",
            "ChatgptSharing": [
                {
                    "Title": "Toggle menu",
                    "Conversations": [
                        {"ListOfCode": [
                            {"Type": "javascript", "Content": "function toggle(menu) {\n  menu.open = !menu.open;\n}\n"}
                        ]}
                    ]
                }
            ]
        }
    ]
}"#;

fn run(workspace: &Workspace, args: &[&str]) -> String {
    let mut argv = vec!["snip"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("arguments should parse");
    let mut out = Vec::new();
    run_command(cli.command, workspace, &mut out).expect("command should succeed");
    String::from_utf8(out).expect("utf8 output")
}

#[test]
fn extract_classify_and_match_share_workspace_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().to_path_buf();
    fs::create_dir_all(root.join("archives")).expect("mkdir");
    fs::write(root.join("archives/20230914_sharings.json"), ARCHIVE).expect("write archive");
    let workspace = Workspace::new(root.clone(), SnipConfig::default());

    let extract = run(&workspace, &["extract"]);
    assert!(extract.contains("Snippets saved: 3"));
    assert!(extract.contains("Other language tags: bash"));
    assert!(root.join("snippets/Parse_CSV_rows__Python_/snippet_0_0_1.py").is_file());
    assert!(root.join("results/extraction_report.json").is_file());

    let classify = run(&workspace, &["classify"]);
    assert!(classify.contains("Python snippets: 2"));
    let accepted = fs::read_to_string(root.join("results/classification/accepted_python_snippets.txt"))
        .expect("accepted list");
    assert_eq!(accepted.lines().count(), 1);

    let matched = run(&workspace, &["match", "--source-files-only"]);
    assert!(matched.contains("Exact title matches: 2"));
    assert!(matched.contains("Mappings dropped as non-source URLs: 1"));

    let mappings: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(root.join("results/provenance/snippet_to_source.json")).expect("mappings"),
    )
    .expect("json");
    let mappings = mappings.as_object().expect("object");
    assert_eq!(mappings.len(), 1);
    let (path, mapping) = mappings.iter().next().expect("one mapping");
    assert!(path.ends_with("snippet_0_0_1.py"));
    assert_eq!(mapping["upstream_title"], "parse csv rows");
}

#[test]
fn report_reads_drift_results() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().to_path_buf();
    fs::create_dir_all(root.join("results")).expect("mkdir");
    fs::write(
        root.join("results/drift.json"),
        r#"{
            "snippets": {
                "a/snippet_0_0_1.py": {"url": "https://github.com/o/r/blob/main/a.py", "language": "python",
                                        "fixed": 2, "introduced": 0, "unchanged": 1},
                "b/snippet_0_0_1.js": {"url": "https://github.com/o/r/blob/main/b.js", "language": "javascript",
                                        "fixed": 0, "introduced": 3, "unchanged": 0}
            },
            "skipped": 4
        }"#,
    )
    .expect("write drift");
    let workspace = Workspace::new(root.clone(), SnipConfig::default());

    let report = run(&workspace, &["report"]);

    assert!(report.contains("Total snippets: 2"));
    assert!(report.contains("Largest net improvement: a/snippet_0_0_1.py (+2)"));
    let csv = fs::read_to_string(root.join("results/report/drift_summary.csv")).expect("csv");
    assert!(csv.contains("b/snippet_0_0_1.js,0,3,0,-3"));
    assert!(root.join("results/report/drift_by_language.csv").is_file());
}

#[test]
fn missing_inputs_fail_before_work() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workspace = Workspace::new(temp.path().to_path_buf(), SnipConfig::default());
    let cli = Cli::try_parse_from(["snip", "fetch"]).expect("parse");
    let mut out = Vec::new();

    let err = run_command(cli.command, &workspace, &mut out).expect_err("missing mappings");

    assert!(err.to_string().contains("required input not found"));
    assert!(!temp.path().join("results").exists());
}

use std::fs;

use snip_core::{Language, SnippetCategory};
use snip_parse::{SnippetClassifier, braces_balanced};

fn classify_fixture(path: &str) -> snip_parse::Classification {
    let mut classifier = SnippetClassifier::new().expect("classifier");
    classifier
        .classify_path(std::path::Path::new(path))
        .expect("classify fixture")
}

#[test]
fn python_fixture_with_class_is_successful() {
    let classification = classify_fixture("tests/fixtures/python_definitions.py");

    assert_eq!(classification.language, Language::Python);
    assert_eq!(classification.category, SnippetCategory::Successful);
    assert_eq!(classification.complete, None);
    assert!(classification.is_accepted());
}

#[test]
fn javascript_script_fixture_is_executable_but_balanced() {
    let classification = classify_fixture("tests/fixtures/js_script.js");

    assert_eq!(classification.language, Language::JavaScript);
    assert_eq!(classification.category, SnippetCategory::Executable);
    assert_eq!(classification.complete, Some(true));
    assert!(!classification.is_accepted());
}

#[test]
fn javascript_definition_with_stray_brace_is_not_accepted() {
    let classification = classify_fixture("tests/fixtures/js_unbalanced.js");

    assert_eq!(classification.category, SnippetCategory::Successful);
    assert_eq!(classification.complete, Some(false));
    assert!(!classification.is_accepted());
}

#[test]
fn unsupported_extensions_are_errors() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("snippet_0_0_1.rb");
    fs::write(&path, "puts 1\n").expect("write snippet");

    let mut classifier = SnippetClassifier::new().expect("classifier");
    assert!(!classifier.supports_path(&path));
    assert!(classifier.classify_path(&path).is_err());
}

#[test]
fn brace_balance_ignores_string_context() {
    assert!(!braces_balanced("const s = '}'; {"));
    assert!(braces_balanced("{ { } }"));
    assert!(braces_balanced("no braces at all"));
    assert!(!braces_balanced("} {"));
    assert!(!braces_balanced("{ {"));
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snip_core::{Language, SnippetCategory, normalize_path};
use snip_parse::SnippetClassifier;
use walkdir::WalkDir;

use crate::AnalysisError;
use crate::output::{CsvTable, write_json, write_path_list, write_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSnippet {
    pub path: String,
    pub language: Language,
    pub category: SnippetCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
}

impl ClassifiedSnippet {
    /// Successful snippets, minus JavaScript with unbalanced braces.
    pub fn is_accepted(&self) -> bool {
        self.category == SnippetCategory::Successful && self.complete != Some(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusClassification {
    pub snippets: Vec<ClassifiedSnippet>,
    pub unreadable: usize,
}

impl CorpusClassification {
    pub fn by_category(&self) -> BTreeMap<SnippetCategory, Vec<String>> {
        let mut grouped: BTreeMap<SnippetCategory, Vec<String>> = BTreeMap::new();
        for snippet in &self.snippets {
            grouped
                .entry(snippet.category)
                .or_default()
                .push(snippet.path.clone());
        }
        grouped
    }

    pub fn counts(&self, language: Language) -> BTreeMap<SnippetCategory, usize> {
        let mut counts = SnippetCategory::ALL
            .into_iter()
            .map(|category| (category, 0usize))
            .collect::<BTreeMap<_, _>>();
        for snippet in self.snippets.iter().filter(|snippet| snippet.language == language) {
            *counts.entry(snippet.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn accepted(&self, language: Language) -> Vec<String> {
        self.snippets
            .iter()
            .filter(|snippet| snippet.language == language && snippet.is_accepted())
            .map(|snippet| snippet.path.clone())
            .collect()
    }

    pub fn incomplete_javascript(&self) -> usize {
        self.snippets
            .iter()
            .filter(|snippet| {
                snippet.language == Language::JavaScript
                    && snippet.category == SnippetCategory::Successful
                    && snippet.complete == Some(false)
            })
            .count()
    }
}

/// Classifies every supported file under `root`, in path order.
pub fn classify_corpus(
    classifier: &mut SnippetClassifier,
    root: &Path,
) -> Result<CorpusClassification, AnalysisError> {
    if !root.is_dir() {
        return Err(AnalysisError::MissingInput(root.to_path_buf()));
    }

    let mut result = CorpusClassification::default();
    let walker = WalkDir::new(root).sort_by_file_name().into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                result.unreadable += 1;
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !classifier.supports_path(path) {
            continue;
        }

        match classifier.classify_path(path) {
            Ok(classification) => result.snippets.push(ClassifiedSnippet {
                path: normalize_path(&path.to_string_lossy()),
                language: classification.language,
                category: classification.category,
                complete: classification.complete,
            }),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to classify snippet");
                result.unreadable += 1;
            }
        }
    }

    Ok(result)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationOutputs {
    pub categories_json: PathBuf,
    pub categories_csv: PathBuf,
    pub summary_txt: PathBuf,
    pub accepted: BTreeMap<Language, PathBuf>,
}

pub fn accepted_list_name(language: Language) -> String {
    format!("accepted_{}_snippets.txt", language.as_str())
}

pub fn write_classification_outputs(
    result: &CorpusClassification,
    output_dir: &Path,
) -> Result<ClassificationOutputs, AnalysisError> {
    let categories_json = output_dir.join("snippet_categories.json");
    let labeled = result
        .by_category()
        .into_iter()
        .map(|(category, paths)| (category.label().to_owned(), paths))
        .collect::<BTreeMap<_, _>>();
    write_json(&categories_json, &labeled)?;

    let mut table = CsvTable::new(&["Code Snippet", "Category"]);
    for snippet in &result.snippets {
        table.push_row(vec![snippet.path.clone(), snippet.category.label().to_owned()]);
    }
    let categories_csv = table.write(&output_dir.join("snippet_categories.csv"))?;

    let summary_txt = output_dir.join("classification_summary.txt");
    write_text(&summary_txt, &render_summary(result))?;

    let mut accepted = BTreeMap::new();
    for language in Language::ALL {
        let path = output_dir.join(accepted_list_name(language));
        write_path_list(&path, &result.accepted(language))?;
        accepted.insert(language, path);
    }

    Ok(ClassificationOutputs {
        categories_json,
        categories_csv,
        summary_txt,
        accepted,
    })
}

pub fn render_summary(result: &CorpusClassification) -> String {
    let mut out = String::new();
    for language in Language::ALL {
        let counts = result.counts(language);
        let total = counts.values().sum::<usize>();
        out.push_str(&format!("{} snippets: {total}\n", language.display_name()));
        for (category, count) in counts {
            out.push_str(&format!("  {}: {count}\n", category.label()));
        }
        out.push_str(&format!(
            "  Accepted for analysis: {}\n",
            result.accepted(language).len()
        ));
    }
    out.push_str(&format!(
        "Incomplete JavaScript definitions: {}\n",
        result.incomplete_javascript()
    ));
    out.push_str(&format!("Unreadable files: {}\n", result.unreadable));
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn corpus() -> (tempfile::TempDir, CorpusClassification) {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("snippets");
        let title = root.join("Parse_CSV");
        fs::create_dir_all(&title).expect("mkdir");
        fs::write(title.join("snippet_0_0_1.py"), "def f():\n    pass\n").expect("write");
        fs::write(title.join("snippet_0_0_2.py"), "import os\n").expect("write");
        fs::write(title.join("snippet_0_0_3.js"), "function f() { return '{'; }\n").expect("write");
        fs::write(title.join("snippet_0_0_4.js"), "function g() { return 1; }\n").expect("write");
        fs::write(title.join("notes.md"), "# ignored\n").expect("write");

        let mut classifier = SnippetClassifier::new().expect("classifier");
        let result = classify_corpus(&mut classifier, &root).expect("classify");
        (temp, result)
    }

    #[test]
    fn classifies_supported_files_and_filters_accepted_corpus() {
        let (_temp, result) = corpus();

        assert_eq!(result.snippets.len(), 4);
        assert_eq!(result.accepted(Language::Python).len(), 1);
        let accepted_js = result.accepted(Language::JavaScript);
        assert_eq!(accepted_js.len(), 1);
        assert!(accepted_js[0].ends_with("snippet_0_0_4.js"));
        assert_eq!(result.incomplete_javascript(), 1);
        assert_eq!(
            result.counts(Language::Python).get(&SnippetCategory::OnlyImport),
            Some(&1)
        );
    }

    #[test]
    fn writes_every_output_file() {
        let (temp, result) = corpus();
        let out = temp.path().join("classified");

        let outputs = write_classification_outputs(&result, &out).expect("outputs");

        let csv = fs::read_to_string(&outputs.categories_csv).expect("csv");
        assert!(csv.starts_with("Code Snippet,Category\n"));
        assert!(csv.contains("snippet_0_0_2.py,Only Import"));
        let json = fs::read_to_string(&outputs.categories_json).expect("json");
        assert!(json.contains("\"Successful\""));
        let python_list = fs::read_to_string(&outputs.accepted[&Language::Python]).expect("list");
        assert!(python_list.trim_end().ends_with("snippet_0_0_1.py"));
        let summary = fs::read_to_string(&outputs.summary_txt).expect("summary");
        assert!(summary.contains("Python snippets: 2"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let mut classifier = SnippetClassifier::new().expect("classifier");
        let err = classify_corpus(&mut classifier, Path::new("/definitely/not/here"))
            .expect_err("missing root");
        assert!(matches!(err, AnalysisError::MissingInput(_)));
    }
}

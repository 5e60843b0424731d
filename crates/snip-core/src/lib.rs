mod archive;
mod secret;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use archive::{
    ArchiveError, ArchiveSource, CodeBlock, ConversationTurn, ParsedArchive, Sharing,
    load_archive, parse_archive,
};
pub use secret::Secret;

pub const UNKNOWN_CONVERSATION: &str = "unknown_conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Python, Language::JavaScript];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::JavaScript => "js",
        }
    }

    /// Recognizes a conversation-archive code block tag by case-insensitive prefix.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.starts_with("python") {
            Some(Self::Python)
        } else if tag.starts_with("javascript") {
            Some(Self::JavaScript)
        } else {
            None
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "py" => Some(Self::Python),
            "js" => Some(Self::JavaScript),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub enum SnippetCategory {
    #[serde(rename = "Successful")]
    Successful,
    #[serde(rename = "Failed")]
    Failed,
    #[serde(rename = "Executable")]
    Executable,
    #[serde(rename = "No Function/Class Definition")]
    NoDefinition,
    #[serde(rename = "Only Import")]
    OnlyImport,
}

impl SnippetCategory {
    pub const ALL: [SnippetCategory; 5] = [
        SnippetCategory::Successful,
        SnippetCategory::Failed,
        SnippetCategory::Executable,
        SnippetCategory::NoDefinition,
        SnippetCategory::OnlyImport,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Successful => "Successful",
            Self::Failed => "Failed",
            Self::Executable => "Executable",
            Self::NoDefinition => "No Function/Class Definition",
            Self::OnlyImport => "Only Import",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub enum IssueCategory {
    #[serde(rename = "Code Style")]
    CodeStyle,
    #[serde(rename = "Code Smell")]
    CodeSmell,
    #[serde(rename = "Potential Bug")]
    PotentialBug,
    #[serde(rename = "Code Vulnerability")]
    CodeVulnerability,
    #[serde(rename = "Uncategorized")]
    Uncategorized,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 5] = [
        IssueCategory::CodeStyle,
        IssueCategory::CodeSmell,
        IssueCategory::PotentialBug,
        IssueCategory::CodeVulnerability,
        IssueCategory::Uncategorized,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::CodeStyle => "Code Style",
            Self::CodeSmell => "Code Smell",
            Self::PotentialBug => "Potential Bug",
            Self::CodeVulnerability => "Code Vulnerability",
            Self::Uncategorized => "Uncategorized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "snake_case")]
pub enum LinterKind {
    Pylint,
    Flake8,
    Bandit,
    Eslint,
}

impl LinterKind {
    pub const ALL: [LinterKind; 4] = [
        LinterKind::Pylint,
        LinterKind::Flake8,
        LinterKind::Bandit,
        LinterKind::Eslint,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pylint => "pylint",
            Self::Flake8 => "flake8",
            Self::Bandit => "bandit",
            Self::Eslint => "eslint",
        }
    }

    pub fn language(self) -> Language {
        match self {
            Self::Pylint | Self::Flake8 | Self::Bandit => Language::Python,
            Self::Eslint => Language::JavaScript,
        }
    }

    /// Linter used when comparing revisions of an upstream file.
    pub fn default_for(language: Language) -> Self {
        match language {
            Language::Python => Self::Pylint,
            Language::JavaScript => Self::Eslint,
        }
    }
}

impl std::str::FromStr for LinterKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "pylint" => Ok(Self::Pylint),
            "flake8" => Ok(Self::Flake8),
            "bandit" => Ok(Self::Bandit),
            "eslint" => Ok(Self::Eslint),
            other => Err(format!(
                "invalid linter '{other}', expected one of: pylint, flake8, bandit, eslint"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
    Undefined,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Undefined,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Undefined => "UNDEFINED",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            "LOW" => Self::Low,
            _ => Self::Undefined,
        }
    }
}

/// One linter or scanner finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub tool: LinterKind,
    pub code: String,
    pub message: String,
    pub line: u32,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

/// A code block written to disk by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub conversation: String,
    pub source_index: usize,
    pub sharing_index: usize,
    pub sequence: usize,
    pub language: Language,
    pub path: String,
    #[serde(default, skip_serializing)]
    pub content: String,
}

impl Snippet {
    pub fn file_name(
        source_index: usize,
        sharing_index: usize,
        sequence: usize,
        language: Language,
    ) -> String {
        format!(
            "snippet_{source_index}_{sharing_index}_{sequence}.{}",
            language.extension()
        )
    }
}

/// Keeps alphanumerics, `-` and `_`; every other character becomes `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// A snippet's conversation is the directory that holds it.
pub fn conversation_of(path: &str) -> String {
    let normalized = normalize_path(path);
    let mut parts = normalized.rsplit('/').filter(|part| !part.is_empty());
    let _file = parts.next();
    parts
        .next()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| UNKNOWN_CONVERSATION.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tags_match_by_case_insensitive_prefix() {
        assert_eq!(Language::from_tag("Python"), Some(Language::Python));
        assert_eq!(Language::from_tag(" python3 "), Some(Language::Python));
        assert_eq!(Language::from_tag("JavaScript"), Some(Language::JavaScript));
        assert_eq!(Language::from_tag("bash"), None);
        assert_eq!(Language::from_tag(""), None);
    }

    #[test]
    fn language_from_path_uses_extension() {
        assert_eq!(Language::from_path("a/b/snippet_0_0_1.py"), Some(Language::Python));
        assert_eq!(Language::from_path("a/b/snippet_0_0_1.JS"), Some(Language::JavaScript));
        assert_eq!(Language::from_path("a/b/readme.md"), None);
    }

    #[test]
    fn sanitize_name_replaces_everything_but_word_characters_and_dashes() {
        assert_eq!(sanitize_name("Add CSS rule (v2)"), "Add_CSS_rule__v2_");
        assert_eq!(sanitize_name("already-safe_name"), "already-safe_name");
        assert_eq!(sanitize_name("掲示板アプリ概要"), "掲示板アプリ概要");
    }

    #[test]
    fn conversation_is_parent_directory() {
        assert_eq!(
            conversation_of("../conversations_new/Add_CSS_rule/snippet_1_0_1.js"),
            "Add_CSS_rule"
        );
        assert_eq!(conversation_of("dir\\Title\\snippet.py"), "Title");
        assert_eq!(conversation_of("snippet.py"), UNKNOWN_CONVERSATION);
    }

    #[test]
    fn category_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&SnippetCategory::NoDefinition).expect("serialize");
        assert_eq!(json, "\"No Function/Class Definition\"");
        let json = serde_json::to_string(&IssueCategory::CodeVulnerability).expect("serialize");
        assert_eq!(json, "\"Code Vulnerability\"");
    }

    #[test]
    fn snippet_file_names_encode_indices() {
        assert_eq!(
            Snippet::file_name(3, 1, 2, Language::JavaScript),
            "snippet_3_1_2.js"
        );
    }
}

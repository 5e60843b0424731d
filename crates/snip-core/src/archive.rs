use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("archive has no `Sources` field")]
    MissingSources,
    #[error("archive `Sources` is not a list")]
    SourcesNotList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArchive {
    pub sources: Vec<ArchiveSource>,
    /// Sources or sharings that did not match the schema and were skipped.
    pub malformed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    pub index: usize,
    pub url: Option<String>,
    pub sharings: Vec<Sharing>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sharing {
    pub index: usize,
    pub title: Option<String>,
    pub conversations: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConversationTurn {
    #[serde(rename = "ListOfCode", default)]
    pub code_blocks: Vec<CodeBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodeBlock {
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(rename = "URL", default)]
    url: Option<String>,
    #[serde(rename = "ChatgptSharing", default)]
    sharings: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawSharing {
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Conversations", default)]
    conversations: Vec<ConversationTurn>,
}

pub fn load_archive(path: impl AsRef<Path>) -> Result<ParsedArchive, ArchiveError> {
    let raw = fs::read_to_string(path)?;
    parse_archive(&raw)
}

/// Validates the document shape up front, then parses each source and sharing on
/// its own so one bad entry only costs itself. Original indices are preserved.
pub fn parse_archive(raw: &str) -> Result<ParsedArchive, ArchiveError> {
    let document: Value = serde_json::from_str(raw)?;
    let sources = match document.get("Sources") {
        None => return Err(ArchiveError::MissingSources),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ArchiveError::SourcesNotList),
    };

    let mut parsed = Vec::with_capacity(sources.len());
    let mut malformed = 0usize;

    for (source_index, value) in sources.iter().enumerate() {
        let source = match RawSource::deserialize(value) {
            Ok(source) => source,
            Err(_) => {
                malformed += 1;
                continue;
            }
        };

        let mut sharings = Vec::with_capacity(source.sharings.len());
        for (sharing_index, value) in source.sharings.iter().enumerate() {
            match RawSharing::deserialize(value) {
                Ok(sharing) => sharings.push(Sharing {
                    index: sharing_index,
                    title: non_blank(sharing.title),
                    conversations: sharing.conversations,
                }),
                Err(_) => malformed += 1,
            }
        }

        parsed.push(ArchiveSource {
            index: source_index,
            url: non_blank(source.url),
            sharings,
        });
    }

    Ok(ParsedArchive {
        sources: parsed,
        malformed,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_code_blocks_and_keeps_indices() {
        let raw = r#"{
            "Sources": [
                {
                    "URL": "https://github.com/o/r/blob/abc/app.py",
                    "ChatgptSharing": [
                        {
                            "Title": "Parse CSV",
                            "Conversations": [
                                {"ListOfCode": [{"Type": "python", "Content": "x = 1"}]}
                            ]
                        }
                    ]
                }
            ]
        }"#;

        let archive = parse_archive(raw).expect("parse archive");

        assert_eq!(archive.malformed, 0);
        assert_eq!(archive.sources.len(), 1);
        let source = &archive.sources[0];
        assert_eq!(source.url.as_deref(), Some("https://github.com/o/r/blob/abc/app.py"));
        assert_eq!(source.sharings[0].title.as_deref(), Some("Parse CSV"));
        let block = &source.sharings[0].conversations[0].code_blocks[0];
        assert_eq!(block.kind.as_deref(), Some("python"));
        assert_eq!(block.content.as_deref(), Some("x = 1"));
    }

    #[test]
    fn malformed_entries_are_counted_and_skipped() {
        let raw = r#"{
            "Sources": [
                "not an object",
                {"ChatgptSharing": [42, {"Title": null, "Conversations": []}]}
            ]
        }"#;

        let archive = parse_archive(raw).expect("parse archive");

        assert_eq!(archive.malformed, 2);
        assert_eq!(archive.sources.len(), 1);
        assert_eq!(archive.sources[0].index, 1);
        assert_eq!(archive.sources[0].sharings.len(), 1);
        assert_eq!(archive.sources[0].sharings[0].index, 1);
        assert_eq!(archive.sources[0].sharings[0].title, None);
    }

    #[test]
    fn document_level_problems_are_structured_errors() {
        assert!(matches!(parse_archive("{}"), Err(ArchiveError::MissingSources)));
        assert!(matches!(
            parse_archive(r#"{"Sources": {}}"#),
            Err(ArchiveError::SourcesNotList)
        ));
        assert!(matches!(parse_archive("not json"), Err(ArchiveError::Json(_))));
    }

    #[test]
    fn load_archive_reads_from_disk() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("sharings.json");
        fs::write(&path, r#"{"Sources": []}"#).expect("write archive");

        let archive = load_archive(&path).expect("load archive");
        assert!(archive.sources.is_empty());
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use snip_core::{Language, SnippetCategory};
use thiserror::Error;
use tree_sitter::{Node, Parser};

use crate::registry::{LanguageConfig, LanguageRegistry, default_registry};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported snippet file: {0}")]
    Unsupported(String),
    #[error("failed to load {0} tree-sitter grammar")]
    GrammarLoad(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub language: Language,
    pub category: SnippetCategory,
    /// Language-specific completeness (JavaScript brace balance); `None` when not tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
}

impl Classification {
    /// Whether the snippet belongs to the corpus handed to static analysis.
    pub fn is_accepted(&self) -> bool {
        self.category == SnippetCategory::Successful && self.complete != Some(false)
    }
}

pub struct SnippetClassifier {
    registry: LanguageRegistry,
    parsers: HashMap<&'static str, Parser>,
}

#[derive(Debug, Default)]
struct KindScan {
    has_definition: bool,
    has_executable: bool,
    has_rejected: bool,
}

impl SnippetClassifier {
    pub fn new() -> Result<Self, ClassifyError> {
        let registry = default_registry();
        let mut parsers = HashMap::new();

        for config in registry.configs() {
            let mut parser = Parser::new();
            parser
                .set_language(&config.ts_language)
                .map_err(|_| ClassifyError::GrammarLoad(config.id))?;
            parsers.insert(config.id, parser);
        }

        Ok(Self { registry, parsers })
    }

    pub fn supports_path(&self, path: &Path) -> bool {
        self.registry.get_by_path(path).is_some()
    }

    pub fn classify_path(&mut self, path: &Path) -> Result<Classification, ClassifyError> {
        let language = self
            .registry
            .get_by_path(path)
            .map(|config| config.language)
            .ok_or_else(|| ClassifyError::Unsupported(path.display().to_string()))?;
        let bytes = fs::read(path)?;
        let source = String::from_utf8_lossy(&bytes);
        self.classify_source(language, &source)
    }

    /// Precedence: parse failure, then definitions, then executable statements,
    /// then a leading import, then everything else.
    pub fn classify_source(
        &mut self,
        language: Language,
        source: &str,
    ) -> Result<Classification, ClassifyError> {
        let config = self
            .registry
            .get_by_language(language)
            .ok_or_else(|| ClassifyError::Unsupported(language.as_str().to_owned()))?;
        let parser = self
            .parsers
            .get_mut(config.id)
            .ok_or_else(|| ClassifyError::Unsupported(config.id.to_owned()))?;

        let failed = Classification {
            language,
            category: SnippetCategory::Failed,
            complete: None,
        };

        if source.trim().is_empty() {
            return Ok(failed);
        }
        let Some(tree) = parser.parse(source, None) else {
            return Ok(failed);
        };
        let root = tree.root_node();
        if root.has_error() {
            return Ok(failed);
        }

        let scan = scan_kinds(root, config);
        if scan.has_rejected {
            return Ok(failed);
        }

        let category = if scan.has_definition {
            SnippetCategory::Successful
        } else if scan.has_executable {
            SnippetCategory::Executable
        } else if first_statement_is_import(root, config) {
            SnippetCategory::OnlyImport
        } else {
            SnippetCategory::NoDefinition
        };
        let complete = config
            .hooks
            .as_ref()
            .and_then(|hooks| hooks.is_complete(source));

        Ok(Classification {
            language,
            category,
            complete,
        })
    }
}

fn scan_kinds(root: Node<'_>, config: &LanguageConfig) -> KindScan {
    let mut scan = KindScan::default();
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        let kind = node.kind();
        if node.is_named()
            && (config.rejected_kinds.contains(&kind)
                || config.hooks.as_ref().is_some_and(|hooks| hooks.is_misplaced(node)))
        {
            scan.has_rejected = true;
            return scan;
        }
        if config.definition_kinds.contains(&kind) {
            scan.has_definition = true;
        } else if config.executable_kinds.contains(&kind) {
            scan.has_executable = true;
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return scan;
            }
        }
    }
}

fn first_statement_is_import(root: Node<'_>, config: &LanguageConfig) -> bool {
    let mut cursor = root.walk();
    let first = root
        .named_children(&mut cursor)
        .find(|child| !config.trivia_kinds.contains(&child.kind()));
    first.is_some_and(|node| config.import_kinds.contains(&node.kind()))
}

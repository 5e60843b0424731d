use std::collections::HashMap;
use std::path::Path;

use snip_core::Language;
use tree_sitter::Node;

use crate::languages;

/// Grammar plus the node kinds the classifier looks for in one language.
pub struct LanguageConfig {
    pub id: &'static str,
    pub language: Language,
    pub extensions: &'static [&'static str],
    pub ts_language: tree_sitter::Language,
    /// Function or class definitions.
    pub definition_kinds: &'static [&'static str],
    /// Control-flow, assignment and expression statements.
    pub executable_kinds: &'static [&'static str],
    pub import_kinds: &'static [&'static str],
    /// Kinds the grammar accepts but the target interpreter rejects.
    pub rejected_kinds: &'static [&'static str],
    pub trivia_kinds: &'static [&'static str],
    pub hooks: Option<Box<dyn LanguageHooks>>,
}

pub trait LanguageHooks: Send + Sync {
    /// Extra completeness check layered on top of a successful parse.
    fn is_complete(&self, _source: &str) -> Option<bool> {
        None
    }

    /// Named nodes the grammar accepts in a position the compiler rejects.
    fn is_misplaced(&self, _node: Node<'_>) -> bool {
        false
    }
}

pub struct LanguageRegistry {
    configs: Vec<LanguageConfig>,
    extension_index: HashMap<String, usize>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self {
            configs: Vec::new(),
            extension_index: HashMap::new(),
        }
    }

    pub fn register(&mut self, config: LanguageConfig) {
        let index = self.configs.len();
        for ext in config.extensions {
            let normalized = normalize_extension(ext);
            self.extension_index.entry(normalized).or_insert(index);
        }
        self.configs.push(config);
    }

    pub fn get_by_extension(&self, extension: &str) -> Option<&LanguageConfig> {
        let normalized = normalize_extension(extension);
        let index = *self.extension_index.get(&normalized)?;
        self.configs.get(index)
    }

    pub fn get_by_path(&self, path: &Path) -> Option<&LanguageConfig> {
        let ext = path.extension()?.to_string_lossy();
        self.get_by_extension(&ext)
    }

    pub fn get_by_language(&self, language: Language) -> Option<&LanguageConfig> {
        self.configs
            .iter()
            .find(|config| config.language == language)
    }

    pub fn configs(&self) -> &[LanguageConfig] {
        &self.configs
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        default_registry()
    }
}

pub fn default_registry() -> LanguageRegistry {
    let mut registry = LanguageRegistry::new();
    registry.register(languages::python::config());
    registry.register(languages::javascript::config());
    registry
}

fn normalize_extension(extension: &str) -> String {
    extension
        .trim_start_matches('.')
        .trim()
        .to_ascii_lowercase()
}

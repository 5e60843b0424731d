use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use snip_core::{IssueCategory, LinterKind};

use crate::LintError;
use crate::categorize::RuleTable;

static MESSAGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:([a-z0-9\-]+) \(([A-Z]\d{4})\): \*(.+)\*").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub symbol: String,
    pub description: String,
    pub category: IssueCategory,
}

/// Pylint rule descriptions keyed by message id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleCatalog {
    entries: BTreeMap<String, RuleEntry>,
}

impl RuleCatalog {
    /// Parses `pylint --list-msgs` output. Lines that are not message headers are ignored.
    pub fn from_pylint_messages(text: &str) -> Self {
        let table = RuleTable::for_tool(LinterKind::Pylint);
        let mut entries = BTreeMap::new();

        for line in text.lines() {
            let Some(captures) = MESSAGE_LINE.captures(line.trim_end()) else {
                continue;
            };
            let symbol = captures[1].to_owned();
            let code = captures[2].to_owned();
            let description = captures[3].trim().to_owned();
            let category = table.categorize(&code, &description);
            entries.insert(
                code,
                RuleEntry {
                    symbol,
                    description,
                    category,
                },
            );
        }

        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self, LintError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), LintError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&RuleEntry> {
        self.entries.get(code)
    }

    pub fn description(&self, code: &str) -> Option<&str> {
        self.get(code).map(|entry| entry.description.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &RuleEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_by_category(&self) -> BTreeMap<IssueCategory, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.category).or_insert(0) += 1;
        }
        counts
    }
}

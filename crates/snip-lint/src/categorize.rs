use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use snip_core::{Diagnostic, IssueCategory, LinterKind, conversation_of};

use crate::catalog::RuleCatalog;

pub const VULNERABILITY_KEYWORDS: [&str; 5] = ["security", "unsafe", "eval", "exec", "injection"];
pub const SMELL_KEYWORDS: [&str; 3] = ["deprecated", "redundant", "inefficient"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Category(IssueCategory),
    /// Potential Bug unless the description names a security or smell keyword.
    KeywordOverride,
}

/// Prefix table for one tool. Longest matching prefix wins.
#[derive(Debug, Clone)]
pub struct RuleTable {
    tool: LinterKind,
    prefixes: Vec<(&'static str, RuleAction)>,
}

impl RuleTable {
    pub fn for_tool(tool: LinterKind) -> Self {
        use IssueCategory::*;
        use RuleAction::{Category, KeywordOverride};

        let prefixes: Vec<(&'static str, RuleAction)> = match tool {
            LinterKind::Pylint => vec![
                ("C", Category(CodeStyle)),
                ("R", Category(CodeSmell)),
                ("E", Category(PotentialBug)),
                ("F", Category(PotentialBug)),
                ("W", KeywordOverride),
                ("I", Category(Uncategorized)),
            ],
            LinterKind::Flake8 => vec![
                ("E", Category(CodeStyle)),
                ("W", Category(CodeStyle)),
                ("N", Category(CodeStyle)),
                ("F", Category(PotentialBug)),
                ("C", Category(CodeSmell)),
                ("B", Category(PotentialBug)),
                ("S", Category(CodeVulnerability)),
            ],
            LinterKind::Bandit => vec![("B", Category(CodeVulnerability))],
            LinterKind::Eslint => {
                let mut prefixes = Vec::new();
                for prefix in [
                    "no-eval",
                    "no-implied-eval",
                    "no-new-func",
                    "no-script-url",
                    "security/",
                ] {
                    prefixes.push((prefix, Category(CodeVulnerability)));
                }
                for prefix in ["no-unused", "no-useless", "no-empty", "no-lonely-if", "prefer-"] {
                    prefixes.push((prefix, Category(CodeSmell)));
                }
                for prefix in [
                    "no-undef",
                    "no-unreachable",
                    "no-dupe",
                    "no-cond-assign",
                    "no-redeclare",
                    "fatal-",
                ] {
                    prefixes.push((prefix, Category(PotentialBug)));
                }
                for prefix in [
                    "indent", "quotes", "semi", "comma-", "space-", "brace-", "eol-", "max-len",
                ] {
                    prefixes.push((prefix, Category(CodeStyle)));
                }
                prefixes
            }
        };

        Self { tool, prefixes }
    }

    pub fn tool(&self) -> LinterKind {
        self.tool
    }

    pub fn action_for(&self, code: &str) -> Option<RuleAction> {
        self.prefixes
            .iter()
            .filter(|(prefix, _)| code.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, action)| *action)
    }

    pub fn categorize(&self, code: &str, description: &str) -> IssueCategory {
        match self.action_for(code) {
            Some(RuleAction::Category(category)) => category,
            Some(RuleAction::KeywordOverride) => keyword_override(description),
            None => IssueCategory::Uncategorized,
        }
    }
}

fn keyword_override(description: &str) -> IssueCategory {
    let description = description.to_lowercase();
    if VULNERABILITY_KEYWORDS
        .iter()
        .any(|keyword| description.contains(keyword))
    {
        IssueCategory::CodeVulnerability
    } else if SMELL_KEYWORDS
        .iter()
        .any(|keyword| description.contains(keyword))
    {
        IssueCategory::CodeSmell
    } else {
        IssueCategory::PotentialBug
    }
}

/// Memoized `(tool, code) -> category` lookup. The keyword override reads the
/// catalog description of the rule, or its symbol when no catalog entry exists;
/// never the per-finding message, which embeds user identifiers.
#[derive(Debug, Clone)]
pub struct Categorizer {
    tables: BTreeMap<LinterKind, RuleTable>,
    catalog: Option<RuleCatalog>,
    cache: HashMap<(LinterKind, String), IssueCategory>,
}

impl Categorizer {
    pub fn new() -> Self {
        let tables = LinterKind::ALL
            .into_iter()
            .map(|tool| (tool, RuleTable::for_tool(tool)))
            .collect();
        Self {
            tables,
            catalog: None,
            cache: HashMap::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: RuleCatalog) -> Self {
        self.catalog = Some(catalog);
        self.cache.clear();
        self
    }

    pub fn categorize(&mut self, tool: LinterKind, code: &str, symbol: Option<&str>) -> IssueCategory {
        let key = (tool, code.to_owned());
        if let Some(category) = self.cache.get(&key) {
            return *category;
        }

        let description = self
            .catalog
            .as_ref()
            .filter(|_| tool == LinterKind::Pylint)
            .and_then(|catalog| catalog.description(code))
            .or(symbol)
            .unwrap_or_default();
        let category = self
            .tables
            .get(&tool)
            .map(|table| table.categorize(code, description))
            .unwrap_or(IssueCategory::Uncategorized);

        self.cache.insert(key, category);
        category
    }

    pub fn cached_codes(&self) -> usize {
        self.cache.len()
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCount {
    pub code: String,
    pub count: usize,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: IssueCategory,
    pub total_issues: usize,
    pub files_affected: usize,
    pub conversations_affected: usize,
    pub top_codes: Vec<CodeCount>,
}

#[derive(Debug, Default)]
struct CategoryAccumulator {
    total: usize,
    files: BTreeSet<String>,
    conversations: BTreeSet<String>,
    codes: BTreeMap<String, (usize, String)>,
}

/// Groups diagnostics by category. Every category appears in the output, in
/// taxonomy order, even when it has no issues.
pub fn summarize_by_category(
    report: &BTreeMap<String, Vec<Diagnostic>>,
    categorizer: &mut Categorizer,
    top_n: usize,
) -> Vec<CategorySummary> {
    let mut accumulators: BTreeMap<IssueCategory, CategoryAccumulator> = BTreeMap::new();

    for (path, diagnostics) in report {
        let conversation = conversation_of(path);
        for diagnostic in diagnostics {
            let category = categorizer.categorize(
                diagnostic.tool,
                &diagnostic.code,
                diagnostic.symbol.as_deref(),
            );
            let entry = accumulators.entry(category).or_default();
            entry.total += 1;
            entry.files.insert(path.clone());
            entry.conversations.insert(conversation.clone());
            let code = entry
                .codes
                .entry(diagnostic.code.clone())
                .or_insert_with(|| (0, diagnostic.message.clone()));
            code.0 += 1;
        }
    }

    IssueCategory::ALL
        .into_iter()
        .map(|category| {
            let accumulator = accumulators.remove(&category).unwrap_or_default();
            CategorySummary {
                category,
                total_issues: accumulator.total,
                files_affected: accumulator.files.len(),
                conversations_affected: accumulator.conversations.len(),
                top_codes: rank_codes(accumulator.codes, top_n),
            }
        })
        .collect()
}

/// Highest counts first, ties by code.
pub fn rank_codes(codes: BTreeMap<String, (usize, String)>, top_n: usize) -> Vec<CodeCount> {
    let mut counts = codes
        .into_iter()
        .map(|(code, (count, description))| CodeCount {
            code,
            count,
            description,
        })
        .collect::<Vec<_>>();
    counts.sort_by(|left, right| {
        right
            .count
            .cmp(&left.count)
            .then_with(|| left.code.cmp(&right.code))
    });
    counts.truncate(top_n);
    counts
}

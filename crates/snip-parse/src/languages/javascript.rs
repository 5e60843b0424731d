use snip_core::Language;

use crate::registry::{LanguageConfig, LanguageHooks};

pub fn config() -> LanguageConfig {
    // The TSX grammar is a superset of JavaScript; TypeScript and JSX forms are
    // rejected below so plain scripts are all that classify as valid.
    LanguageConfig {
        id: "javascript",
        language: Language::JavaScript,
        extensions: &["js", "mjs", "cjs"],
        ts_language: tree_sitter_typescript::LANGUAGE_TSX.into(),
        definition_kinds: &[
            "function_declaration",
            "generator_function_declaration",
            "class_declaration",
        ],
        executable_kinds: &[
            "expression_statement",
            "lexical_declaration",
            "variable_declaration",
            "for_statement",
            "for_in_statement",
            "while_statement",
            "do_statement",
            "if_statement",
            "switch_statement",
            "try_statement",
        ],
        import_kinds: &["import_statement"],
        rejected_kinds: &[
            "type_annotation",
            "interface_declaration",
            "type_alias_declaration",
            "enum_declaration",
            "abstract_class_declaration",
            "type_parameters",
            "type_arguments",
            "as_expression",
            "satisfies_expression",
            "non_null_expression",
            "optional_parameter",
            "accessibility_modifier",
            "implements_clause",
            "internal_module",
            "module",
            "ambient_declaration",
            "jsx_element",
            "jsx_self_closing_element",
        ],
        trivia_kinds: &["comment", "hash_bang_line"],
        hooks: Some(Box::new(JavaScriptHooks)),
    }
}

struct JavaScriptHooks;

impl LanguageHooks for JavaScriptHooks {
    fn is_complete(&self, source: &str) -> Option<bool> {
        Some(braces_balanced(source))
    }
}

/// Counts raw `{`/`}` characters, strings and comments included.
pub fn braces_balanced(source: &str) -> bool {
    let mut balance = 0i64;
    for ch in source.chars() {
        match ch {
            '{' => balance += 1,
            '}' => balance -= 1,
            _ => {}
        }
        if balance < 0 {
            return false;
        }
    }
    balance == 0
}

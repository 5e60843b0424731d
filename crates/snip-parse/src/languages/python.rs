use snip_core::Language;

use tree_sitter::Node;

use crate::registry::{LanguageConfig, LanguageHooks};

pub fn config() -> LanguageConfig {
    LanguageConfig {
        id: "python",
        language: Language::Python,
        extensions: &["py", "pyi"],
        ts_language: tree_sitter_python::LANGUAGE.into(),
        definition_kinds: &["function_definition", "class_definition"],
        executable_kinds: &[
            "for_statement",
            "while_statement",
            "if_statement",
            "with_statement",
            "expression_statement",
        ],
        import_kinds: &[
            "import_statement",
            "import_from_statement",
            "future_import_statement",
        ],
        // Python 2 statement forms the grammar still accepts.
        rejected_kinds: &["print_statement", "exec_statement"],
        trivia_kinds: &["comment"],
        hooks: Some(Box::new(PythonHooks)),
    }
}

struct PythonHooks;

impl LanguageHooks for PythonHooks {
    fn is_misplaced(&self, node: Node<'_>) -> bool {
        match node.kind() {
            "return_statement" => !inside_function(node, false),
            "yield" => !inside_function(node, true),
            "break_statement" | "continue_statement" => !inside_loop(node),
            _ => false,
        }
    }
}

/// Walks up to the nearest function; a class body in between ends the search.
fn inside_function(node: Node<'_>, lambda_counts: bool) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "function_definition" => return true,
            "lambda" if lambda_counts => return true,
            "class_definition" => return false,
            _ => {}
        }
        current = ancestor.parent();
    }
    false
}

/// A loop's own `else` clause is outside that loop.
fn inside_loop(node: Node<'_>) -> bool {
    let mut child = node;
    let mut current = node.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "for_statement" | "while_statement" if child.kind() != "else_clause" => return true,
            "function_definition" | "class_definition" | "lambda" => return false,
            _ => {}
        }
        child = ancestor;
        current = ancestor.parent();
    }
    false
}

use std::collections::BTreeSet;

use snip_config::LintConfig;
use snip_core::Diagnostic;

/// Drops configured noise codes and import errors caused by third-party modules
/// that are not installed where the snippets are linted.
#[derive(Debug, Clone, Default)]
pub struct NoiseFilter {
    excluded_codes: BTreeSet<String>,
    import_error_codes: BTreeSet<String>,
    third_party_modules: Vec<String>,
}

impl NoiseFilter {
    pub fn from_config(config: &LintConfig) -> Self {
        Self {
            excluded_codes: config.excluded_codes.iter().cloned().collect(),
            import_error_codes: config.import_error_codes.iter().cloned().collect(),
            third_party_modules: config.third_party_modules.clone(),
        }
    }

    pub fn is_noise(&self, diagnostic: &Diagnostic) -> bool {
        if self.excluded_codes.contains(&diagnostic.code) {
            return true;
        }
        self.import_error_codes.contains(&diagnostic.code)
            && self
                .third_party_modules
                .iter()
                .any(|module| diagnostic.message.contains(module.as_str()))
    }

    pub fn retain(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        diagnostics
            .into_iter()
            .filter(|diagnostic| !self.is_noise(diagnostic))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use snip_config::LintConfig;
    use snip_core::{Diagnostic, LinterKind, Severity};

    use super::NoiseFilter;

    fn pylint(code: &str, message: &str) -> Diagnostic {
        Diagnostic {
            tool: LinterKind::Pylint,
            code: code.to_owned(),
            message: message.to_owned(),
            line: 1,
            severity: Severity::High,
            symbol: None,
        }
    }

    #[test]
    fn third_party_import_errors_and_docstring_codes_are_dropped() {
        let filter = NoiseFilter::from_config(&LintConfig::default());

        let kept = filter.retain(vec![
            pylint("E0401", "Unable to import 'pandas'"),
            pylint("E0401", "Unable to import 'helpers'"),
            pylint("C0116", "Missing function or method docstring"),
            pylint("W0612", "Unused variable 'x'"),
        ]);

        let codes = kept
            .iter()
            .map(|diagnostic| (diagnostic.code.as_str(), diagnostic.message.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            codes,
            vec![
                ("E0401", "Unable to import 'helpers'"),
                ("W0612", "Unused variable 'x'"),
            ]
        );
    }

    #[test]
    fn empty_config_keeps_everything() {
        let filter = NoiseFilter::default();
        assert!(!filter.is_noise(&pylint("E0401", "Unable to import 'pandas'")));
    }
}

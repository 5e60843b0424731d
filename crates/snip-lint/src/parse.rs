use std::collections::BTreeMap;

use serde::Deserialize;
use snip_core::{Diagnostic, LinterKind, Severity};

/// Code given to eslint messages that carry no rule id (fatal parse errors).
pub const FATAL_PARSE_ERROR: &str = "fatal-parse-error";

#[derive(Debug, Deserialize)]
struct PylintMessage {
    #[serde(rename = "message-id")]
    message_id: String,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    line: Option<u32>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Flake8Message {
    code: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    line_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BanditReport {
    #[serde(default)]
    results: Vec<BanditResult>,
}

#[derive(Debug, Deserialize)]
struct BanditResult {
    test_id: String,
    #[serde(default)]
    test_name: Option<String>,
    #[serde(default)]
    issue_text: String,
    #[serde(default)]
    issue_severity: Option<String>,
    #[serde(default)]
    line_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EslintFileResult {
    #[serde(default)]
    messages: Vec<EslintMessage>,
}

#[derive(Debug, Deserialize)]
struct EslintMessage {
    #[serde(rename = "ruleId", default)]
    rule_id: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    severity: Option<u8>,
}

/// Parses one tool's JSON stdout. Blank output means the tool found nothing.
pub fn parse_tool_output(
    tool: LinterKind,
    stdout: &str,
) -> Result<Vec<Diagnostic>, serde_json::Error> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Ok(Vec::new());
    }

    match tool {
        LinterKind::Pylint => parse_pylint(stdout),
        LinterKind::Flake8 => parse_flake8(stdout),
        LinterKind::Bandit => parse_bandit(stdout),
        LinterKind::Eslint => parse_eslint(stdout),
    }
}

fn parse_pylint(stdout: &str) -> Result<Vec<Diagnostic>, serde_json::Error> {
    let messages: Vec<PylintMessage> = serde_json::from_str(stdout)?;
    Ok(messages
        .into_iter()
        .map(|message| {
            let severity = message
                .kind
                .as_deref()
                .and_then(pylint_type_severity)
                .unwrap_or_else(|| infer_severity(LinterKind::Pylint, &message.message_id));
            Diagnostic {
                tool: LinterKind::Pylint,
                code: message.message_id,
                message: message.message,
                line: message.line.unwrap_or(0),
                severity,
                symbol: message.symbol,
            }
        })
        .collect())
}

fn parse_flake8(stdout: &str) -> Result<Vec<Diagnostic>, serde_json::Error> {
    let by_file: BTreeMap<String, Vec<Flake8Message>> = serde_json::from_str(stdout)?;
    Ok(by_file
        .into_values()
        .flatten()
        .map(|message| Diagnostic {
            tool: LinterKind::Flake8,
            severity: infer_severity(LinterKind::Flake8, &message.code),
            code: message.code,
            message: message.text,
            line: message.line_number.unwrap_or(0),
            symbol: None,
        })
        .collect())
}

fn parse_bandit(stdout: &str) -> Result<Vec<Diagnostic>, serde_json::Error> {
    let report: BanditReport = serde_json::from_str(stdout)?;
    Ok(report
        .results
        .into_iter()
        .map(|result| Diagnostic {
            tool: LinterKind::Bandit,
            code: result.test_id,
            message: result.issue_text,
            line: result.line_number.unwrap_or(0),
            severity: result
                .issue_severity
                .as_deref()
                .map(Severity::from_label)
                .unwrap_or(Severity::Undefined),
            symbol: result.test_name,
        })
        .collect())
}

fn parse_eslint(stdout: &str) -> Result<Vec<Diagnostic>, serde_json::Error> {
    let files: Vec<EslintFileResult> = serde_json::from_str(stdout)?;
    Ok(files
        .into_iter()
        .flat_map(|file| file.messages)
        .map(|message| {
            let code = message
                .rule_id
                .filter(|rule| !rule.trim().is_empty())
                .unwrap_or_else(|| FATAL_PARSE_ERROR.to_owned());
            let severity = match message.severity {
                Some(2) => Severity::High,
                Some(1) => Severity::Medium,
                _ => infer_severity(LinterKind::Eslint, &code),
            };
            Diagnostic {
                tool: LinterKind::Eslint,
                code,
                message: message.message,
                line: message.line.unwrap_or(0),
                severity,
                symbol: None,
            }
        })
        .collect())
}

fn pylint_type_severity(kind: &str) -> Option<Severity> {
    match kind {
        "fatal" | "error" => Some(Severity::High),
        "warning" => Some(Severity::Medium),
        "convention" | "refactor" | "info" => Some(Severity::Low),
        _ => None,
    }
}

/// Severity from the code prefix when the tool does not report one.
pub fn infer_severity(tool: LinterKind, code: &str) -> Severity {
    let prefix = code.chars().next().unwrap_or(' ');
    match tool {
        LinterKind::Pylint => match prefix {
            'E' | 'F' => Severity::High,
            'W' => Severity::Medium,
            'C' | 'R' | 'I' => Severity::Low,
            _ => Severity::Undefined,
        },
        LinterKind::Flake8 => match prefix {
            'F' => Severity::High,
            'B' | 'S' => Severity::Medium,
            'E' | 'W' | 'C' | 'N' => Severity::Low,
            _ => Severity::Undefined,
        },
        LinterKind::Bandit => Severity::Undefined,
        LinterKind::Eslint if code == FATAL_PARSE_ERROR => Severity::High,
        LinterKind::Eslint => Severity::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pylint_messages_keep_symbol_and_type_severity() {
        let stdout = r#"[
            {"type": "convention", "module": "snippet", "line": 1, "column": 0,
             "message-id": "C0114", "symbol": "missing-module-docstring",
             "message": "Missing module docstring"},
            {"type": "error", "line": 3, "message-id": "E0401",
             "symbol": "import-error", "message": "Unable to import 'pandas'"}
        ]"#;

        let diagnostics = parse_tool_output(LinterKind::Pylint, stdout).expect("parse");

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].code, "C0114");
        assert_eq!(diagnostics[0].severity, Severity::Low);
        assert_eq!(diagnostics[1].symbol.as_deref(), Some("import-error"));
        assert_eq!(diagnostics[1].severity, Severity::High);
        assert_eq!(diagnostics[1].line, 3);
    }

    #[test]
    fn flake8_output_is_flattened_across_files() {
        let stdout = r#"{"a.py": [{"code": "F401", "text": "'os' imported but unused",
            "line_number": 1, "column_number": 1}], "b.py": []}"#;

        let diagnostics = parse_tool_output(LinterKind::Flake8, stdout).expect("parse");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "F401");
        assert_eq!(diagnostics[0].severity, Severity::High);
    }

    #[test]
    fn bandit_results_use_reported_severity() {
        let stdout = r#"{"errors": [], "results": [
            {"test_id": "B307", "test_name": "blacklist", "issue_text": "Use of possibly insecure function - consider using safer ast.literal_eval.",
             "issue_severity": "MEDIUM", "issue_confidence": "HIGH", "line_number": 4,
             "issue_cwe": {"id": 78, "link": "https://cwe.mitre.org/data/definitions/78.html"}}
        ]}"#;

        let diagnostics = parse_tool_output(LinterKind::Bandit, stdout).expect("parse");

        assert_eq!(diagnostics[0].code, "B307");
        assert_eq!(diagnostics[0].severity, Severity::Medium);
        assert_eq!(diagnostics[0].symbol.as_deref(), Some("blacklist"));
    }

    #[test]
    fn eslint_null_rule_becomes_fatal_parse_error() {
        let stdout = r#"[{"filePath": "/tmp/a.js", "messages": [
            {"ruleId": null, "fatal": true, "severity": 2, "message": "Parsing error: Unexpected token", "line": 2},
            {"ruleId": "no-unused-vars", "severity": 1, "message": "'x' is assigned a value but never used.", "line": 5}
        ]}]"#;

        let diagnostics = parse_tool_output(LinterKind::Eslint, stdout).expect("parse");

        assert_eq!(diagnostics[0].code, FATAL_PARSE_ERROR);
        assert_eq!(diagnostics[0].severity, Severity::High);
        assert_eq!(diagnostics[1].code, "no-unused-vars");
        assert_eq!(diagnostics[1].severity, Severity::Medium);
    }

    #[test]
    fn blank_output_is_empty_and_garbage_is_an_error() {
        assert!(parse_tool_output(LinterKind::Pylint, "  \n").expect("blank").is_empty());
        assert!(parse_tool_output(LinterKind::Eslint, "Oops! Something went wrong").is_err());
    }
}

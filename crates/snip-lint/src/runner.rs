use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use snip_config::{LintConfig, LintToolsConfig};
use snip_core::{Diagnostic, LinterKind};
use tokio::process::Command;
use tokio::runtime::Runtime;

use crate::{LintError, LintReport};
use crate::filter::NoiseFilter;
use crate::parse::parse_tool_output;

/// Runs one external tool over one file.
pub trait Linter {
    /// Never fails: spawn errors, timeouts and unreadable output yield an empty list.
    fn lint_file(&self, tool: LinterKind, path: &Path) -> Vec<Diagnostic>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

pub struct LintRunner {
    tools: LintToolsConfig,
    timeout: Duration,
    filter: NoiseFilter,
    runtime: Runtime,
}

impl LintRunner {
    pub fn new(config: &LintConfig) -> Result<Self, LintError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LintError::Runtime)?;

        Ok(Self {
            tools: config.tools.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            filter: NoiseFilter::from_config(config),
            runtime,
        })
    }

    pub fn command_for(&self, tool: LinterKind, path: &Path) -> ToolCommand {
        let file = path.to_string_lossy().into_owned();
        match tool {
            LinterKind::Pylint => ToolCommand {
                program: self.tools.pylint.clone(),
                args: vec![file, "--output-format=json".to_owned(), "--score=n".to_owned()],
            },
            LinterKind::Flake8 => ToolCommand {
                program: self.tools.flake8.clone(),
                args: vec!["--format=json".to_owned(), file],
            },
            LinterKind::Bandit => ToolCommand {
                program: self.tools.bandit.clone(),
                args: vec!["-f".to_owned(), "json".to_owned(), "-q".to_owned(), file],
            },
            LinterKind::Eslint => {
                let mut args = vec![file, "--format=json".to_owned()];
                if let Some(config) = self.tools.eslint_config.as_deref() {
                    args.push("--config".to_owned());
                    args.push(config.to_owned());
                }
                ToolCommand {
                    program: self.tools.eslint.clone(),
                    args,
                }
            }
        }
    }

    /// Lints and applies the noise filter, surfacing failures to the caller.
    pub fn try_lint(&self, tool: LinterKind, path: &Path) -> Result<Vec<Diagnostic>, LintError> {
        let command = self.command_for(tool, path);
        let stdout = self.run(tool.as_str(), &command)?;
        let diagnostics =
            parse_tool_output(tool, &stdout).map_err(|source| LintError::Output {
                tool: tool.as_str().to_owned(),
                source,
            })?;
        Ok(self.filter.retain(diagnostics))
    }

    /// `pylint --list-msgs` text for the rule catalog.
    pub fn pylint_messages(&self) -> Result<String, LintError> {
        let command = ToolCommand {
            program: self.tools.pylint.clone(),
            args: vec!["--list-msgs".to_owned()],
        };
        self.run("pylint", &command)
    }

    /// Non-zero exit codes are expected when issues are found; only stdout matters.
    fn run(&self, tool: &str, command: &ToolCommand) -> Result<String, LintError> {
        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = self.runtime.block_on(async {
            tokio::time::timeout(self.timeout, process.output()).await
        });

        match output {
            Err(_) => Err(LintError::Timeout {
                tool: tool.to_owned(),
                secs: self.timeout.as_secs(),
            }),
            Ok(Err(source)) => Err(LintError::Spawn {
                tool: tool.to_owned(),
                source,
            }),
            Ok(Ok(output)) => {
                tracing::debug!(
                    tool,
                    status = ?output.status.code(),
                    stderr_bytes = output.stderr.len(),
                    "linter finished"
                );
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
        }
    }
}

impl Linter for LintRunner {
    fn lint_file(&self, tool: LinterKind, path: &Path) -> Vec<Diagnostic> {
        match self.try_lint(tool, path) {
            Ok(diagnostics) => diagnostics,
            Err(err) => {
                tracing::warn!(
                    tool = tool.as_str(),
                    path = %path.display(),
                    error = %err,
                    "linter failed, recording no diagnostics"
                );
                Vec::new()
            }
        }
    }
}

/// Lints every path with one tool. Every path gets an entry, empty when the
/// tool failed or found nothing.
pub fn lint_paths(linter: &dyn Linter, tool: LinterKind, paths: &[String]) -> LintReport {
    let mut report = LintReport::new();
    for (index, path) in paths.iter().enumerate() {
        let diagnostics = linter.lint_file(tool, Path::new(path));
        tracing::debug!(
            tool = tool.as_str(),
            path = %path,
            issues = diagnostics.len(),
            progress = index + 1,
            total = paths.len(),
            "linted snippet"
        );
        report.insert(path.clone(), diagnostics);
    }
    report
}

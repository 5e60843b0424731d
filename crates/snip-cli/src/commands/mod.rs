mod corpus;
mod drift;
mod lint;
mod upstream;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use snip_config::SnipConfig;

use crate::cli::Commands;

pub use corpus::{run_classify, run_extract, run_inventory};
pub use drift::{run_drift, run_report};
pub use lint::{run_categorize, run_lint, run_rules, run_severity};
pub use upstream::{run_fetch, run_history, run_lint_upstream, run_match};

/// Workspace root plus its loaded configuration. Relative paths given on the
/// command line resolve against the root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: SnipConfig,
}

impl Workspace {
    pub fn new(root: PathBuf, config: SnipConfig) -> Self {
        Self { root, config }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SnipConfig {
        &self.config
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

pub fn run_command(command: Commands, workspace: &Workspace, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Extract(args) => run_extract(workspace, &args, out),
        Commands::Inventory(args) => run_inventory(workspace, &args, out),
        Commands::Classify(args) => run_classify(workspace, &args, out),
        Commands::Rules(args) => run_rules(workspace, &args, out),
        Commands::Lint(args) => run_lint(workspace, &args, out),
        Commands::Categorize(args) => run_categorize(workspace, &args, out),
        Commands::Severity(args) => run_severity(workspace, &args, out),
        Commands::Match(args) => run_match(workspace, &args, out),
        Commands::Fetch(args) => run_fetch(workspace, &args, out),
        Commands::History(args) => run_history(workspace, &args, out),
        Commands::Drift(args) => run_drift(workspace, &args, out),
        Commands::LintUpstream(args) => run_lint_upstream(workspace, &args, out),
        Commands::Report(args) => run_report(workspace, &args, out),
    }
}

/// Fails before any stage work when a required input is absent.
fn require_input(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("required input not found: {}", path.display());
    }
    Ok(())
}

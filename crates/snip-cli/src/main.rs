use std::ffi::OsStr;

use anyhow::{Context, Result};
use clap::Parser;
use snip_cli::cli::{Cli, LogFormat};
use snip_cli::commands::{Workspace, run_command};
use snip_config::{config_path, ensure_workspace_config, validate_config};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing(cli.log_format);
    run(cli)
}

fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Human => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.workspace.canonicalize().with_context(|| {
        format!(
            "failed to resolve workspace path {}",
            cli.workspace.display()
        )
    })?;

    let config = ensure_workspace_config(&root).with_context(|| {
        format!(
            "failed to load or create workspace config at {}",
            config_path(&root).display()
        )
    })?;
    for warning in validate_config(&config) {
        eprintln!("snip config warning [{}]: {}", warning.code, warning.message);
    }

    let workspace = Workspace::new(root, config);
    let mut stdout = std::io::stdout().lock();
    run_command(cli.command, &workspace, &mut stdout)
}

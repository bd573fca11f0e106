//! Provisioning Manager CLI
//!
//! The command-line interface for quota accounting and sync state.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use context::ProjectContext;
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| CliError::user(format!("Failed to set tracing subscriber: {}", e)))?;
        tracing::debug!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Init { force }) => {
            let root = match cli.root {
                Some(root) => root,
                None => std::env::current_dir()?,
            };
            commands::run_init(&root, force)
        }
        Some(cmd) => {
            let context = ProjectContext::open(cli.root.as_deref())?;
            execute_command(&context, cmd)
        }
        None => {
            println!("{} Provisioning Manager CLI", "prov".green().bold());
            println!();
            println!("Run {} for available commands.", "prov --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(context: &ProjectContext, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { .. } => Err(CliError::user("init does not take a loaded project")),
        Commands::Owner { action } => commands::run_owner(context, action),
        Commands::Role { action } => commands::run_role(context, action),
        Commands::Quota { action } => commands::run_quota(context, action),
        Commands::Validate {
            owner,
            deltas,
            json,
        } => commands::run_validate(context, &owner, &deltas, json),
        Commands::Release { owner, deltas } => commands::run_release(context, &owner, &deltas),
        Commands::Resize(args) => commands::run_resize(context, &args),
        Commands::Sync { action } => commands::run_sync(context, action),
    }
}

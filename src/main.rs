//! jira-sync - Mirror source tracker tickets onto a JIRA board
//!
//! Main entry point for the jira-sync CLI.

use clap::{Parser, Subcommand};
use jira_sync::config::SyncConfig;
use jira_sync::sync::{RunMode, SyncEngine};
use jira_sync::SyncError;
use std::path::PathBuf;
use std::process;

/// Exit status when a scope or instance failed
const EXIT_SCOPE_FAILED: i32 = 1;

/// Exit status for configuration errors detected before any network access
const EXIT_CONFIG: i32 = 2;

/// jira-sync - Reconcile Pagure, GitHub, GitLab and Forgejo tickets into JIRA
#[derive(Parser, Debug)]
#[command(name = "jira-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/jira-sync/config.toml)
    #[arg(short, long, env = "JIRA_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation pass over every enabled scope
    Sync {
        /// Compute and print the actions without changing the board
        #[arg(long)]
        dry_run: bool,

        /// Only sync the named instances (repeatable)
        #[arg(short, long = "instance", value_name = "NAME")]
        instances: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = jira_sync::logging::init(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_SCOPE_FAILED),
        Err(e) => {
            eprintln!("Error: {}", e);
            let code = if e.is_fatal() {
                EXIT_CONFIG
            } else {
                EXIT_SCOPE_FAILED
            };
            process::exit(code);
        }
    }
}

/// Returns whether every scope succeeded
fn run(cli: Cli) -> jira_sync::Result<bool> {
    let config = match cli.config {
        Some(ref path) => SyncConfig::load(path)?,
        None => match SyncConfig::load_default() {
            Ok(config) => config,
            Err(SyncError::Config(msg)) if msg.contains("Config file not found") => {
                return Err(SyncError::Config(format!(
                    "{}\n\nCreate it or pass --config <path>.",
                    msg
                )));
            }
            Err(e) => return Err(e),
        },
    };

    match cli.command {
        Commands::Sync { dry_run, instances } => {
            let mode = if dry_run {
                RunMode::ReadOnly
            } else {
                RunMode::ReadWrite
            };
            let engine = SyncEngine::from_config(config)?
                .with_mode(mode)
                .with_instances(instances);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let report = runtime.block_on(engine.run());

            if mode.is_read_only() {
                for scope in &report.scopes {
                    for action in &scope.planned {
                        println!("[{}] {}", scope.scope, action);
                    }
                }
            }
            println!("{}", report);

            Ok(!report.has_failures())
        }
    }
}

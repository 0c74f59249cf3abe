//! # acorn
//!
//! Fetches addon tarballs from npm-compatible registries.
//!
//! This is the main entry point for the Acorn CLI tool. It handles command parsing,
//! sets up logging and error handling, and dispatches to the appropriate command handlers.

use std::collections::HashMap;
use std::process::ExitCode;

use acorn_core::error::{AcornError, AcornResult};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Fetch addon tarballs from npm-compatible registries
#[derive(Parser)]
#[command(name = "acorn", version, about = "Fetch addon tarballs from npm registries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Registry URL, overriding acorn.toml and ACORN_REGISTRY_URL
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    /// Addons directory, relative to the project root
    #[arg(long, global = true, value_name = "DIR")]
    pub addons_dir: Option<Utf8PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch one package and write its tarball into the project
    Fetch {
        name: String,
        version: String,
        /// Place it with the shared indirect dependencies
        #[arg(long)]
        indirect: bool,
    },
    /// Print the tarball URL a registry reports for a package
    Manifest { name: String, version: String },
    /// Fetch every dependency listed in acorn.toml or package.json
    Install,
    /// Show version information
    Version,
}

impl Cli {
    /// Flags that override configuration values
    fn config_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(registry) = &self.registry {
            overrides.insert("registry".to_string(), registry.clone());
        }
        if let Some(addons_dir) = &self.addons_dir {
            overrides.insert("addons-dir".to_string(), addons_dir.to_string());
        }
        overrides
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_json);
    setup_panic_handler();

    debug!("Starting Acorn v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", ErrorFormatter::new().format_error(&err));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> AcornResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| AcornError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.config_overrides()).await?;

        // Ctrl+C aborts whatever request is in flight
        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("ACORN_LOG").unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "acorn={level},acorn_cli={level},acorn_config={level},acorn_registry={level},acorn_core={level}"
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Acorn encountered an unexpected error: {}", panic_info);
        eprintln!("Acorn crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}

//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking a [`CommandContext`]. The helpers
//! here turn a layered configuration into a ready registry client and write
//! fetched tarballs into the project.

use std::collections::HashMap;
use std::sync::Arc;

use acorn_config::{AcornToml, ConfigLoader, LoadedConfig};
use acorn_core::error::{AcornError, AcornResult};
use acorn_core::utils::safe_join;
use acorn_registry::{
    FetchObserver, FetchedPackage, HttpClient, HttpConfig, PackageFetcher, RegistryClient, TlsMode,
};
use camino::{Utf8Path, Utf8PathBuf};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod fetch;
pub mod install;
pub mod manifest;


use crate::output::{ConsoleObserver, OutputHandler};
use crate::Commands;

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: Arc<OutputHandler>,
    /// Command-line values layered over every config source
    pub overrides: HashMap<String, String>,
    /// Cancels in-flight requests
    pub cancel: CancellationToken,
}

impl CommandContext {
    /// Create a new command context
    pub async fn new(overrides: HashMap<String, String>) -> AcornResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| AcornError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| AcornError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("'{}' is not valid UTF-8", path.display()),
        })?;

        Ok(Self {
            cwd,
            output: Arc::new(OutputHandler::new()),
            overrides,
            cancel: CancellationToken::new(),
        })
    }

    /// Notification sink for fetch progress
    pub fn observer(&self) -> Arc<dyn FetchObserver> {
        Arc::new(ConsoleObserver::new(self.output.clone()))
    }

    /// Load the layered configuration for the current directory
    pub async fn load_config(&self) -> AcornResult<LoadedConfig> {
        let loaded = ConfigLoader::new(self.cwd.clone())
            .load(self.overrides.clone())
            .await?;
        debug!(source = ?loaded.source, root = %loaded.project_root, "Loaded configuration");
        Ok(loaded)
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> AcornResult<()> {
    match command {
        Commands::Fetch {
            name,
            version,
            indirect,
        } => {
            info!("Fetching {}@{} (indirect: {})", name, version, indirect);
            fetch::execute(name, version, indirect, ctx).await
        },
        Commands::Manifest { name, version } => {
            info!("Resolving manifest for {}@{}", name, version);
            manifest::execute(name, version, ctx).await
        },
        Commands::Install => {
            info!("Installing configured dependencies");
            install::execute(ctx).await
        },
        Commands::Version => show_version(ctx).await,
    }
}

/// Registry client for the configured registry
pub fn registry_client(config: &AcornToml, ctx: &CommandContext) -> AcornResult<RegistryClient> {
    let endpoint = config.registry.endpoint()?;
    let tls = if endpoint.secure {
        TlsMode::Secure
    } else {
        TlsMode::Plain
    };

    let mut http_config = HttpConfig::default()
        .with_tls(tls)
        .with_port(endpoint.port)
        .with_max_ticks(Some(config.fetch.max_poll_ticks))
        .with_timeout(Some(config.fetch.timeout()));
    if let Some(user_agent) = &config.registry.user_agent {
        http_config = http_config.with_user_agent(user_agent.clone());
    }

    let http = HttpClient::with_reqwest(http_config, config.fetch.frame_interval())?
        .with_cancellation(ctx.cancel.clone());

    Ok(RegistryClient::new(http)
        .with_host(endpoint.host)
        .with_observer(ctx.observer()))
}

/// Package fetcher honouring the configured layout and integrity setting
pub fn package_fetcher(config: &AcornToml, ctx: &CommandContext) -> AcornResult<PackageFetcher> {
    Ok(PackageFetcher::new(registry_client(config, ctx)?)
        .with_layout(config.fetch.layout())
        .with_integrity_check(config.fetch.verify_integrity)
        .with_observer(ctx.observer()))
}

/// Write a fetched tarball below `project_root`, creating parent directories
pub async fn write_package(
    project_root: &Utf8Path,
    fetched: &FetchedPackage,
) -> AcornResult<Utf8PathBuf> {
    let target = safe_join(project_root.as_std_path(), fetched.destination.as_std_path())?;
    let target = Utf8PathBuf::from_path_buf(target).map_err(|path| AcornError::ConfigValidation {
        field: "destination".to_string(),
        reason: format!("'{}' is not valid UTF-8", path.display()),
    })?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AcornError::io(format!("Failed to create {}", parent), e))?;
    }
    fs::write(&target, &fetched.bytes)
        .await
        .map_err(|e| AcornError::io(format!("Failed to write {}", target), e))?;

    debug!(path = %target, bytes = fetched.bytes.len(), "Wrote tarball");
    Ok(target)
}

async fn show_version(ctx: &CommandContext) -> AcornResult<()> {
    ctx.output.info(&format!("Acorn v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.info(&format!("Built: {}", env!("BUILD_DATE")));
    ctx.output.info(&format!("Target: {}", env!("ACORN_TARGET")));
    ctx.output.info(&format!("Rust: {}", env!("RUSTC_VERSION")));
    Ok(())
}

//! `acorn install` command implementation.
//!
//! Fetches every dependency declared in the project, one at a time: direct
//! dependencies first, then indirect ones. The first failure ends the run.

use std::time::Instant;

use acorn_core::error::AcornResult;

use super::{package_fetcher, write_package, CommandContext};

/// Execute the `acorn install` command
pub async fn execute(ctx: &CommandContext) -> AcornResult<()> {
    let start_time = Instant::now();
    let loaded = ctx.load_config().await?;

    let packages = loaded.config.packages();
    if packages.is_empty() {
        ctx.output.info("No dependencies to install");
        return Ok(());
    }

    ctx.output.step(
        "↓",
        &format!("Installing {} packages into {}", packages.len(), loaded.config.fetch.addons_dir),
    );

    let fetcher = package_fetcher(&loaded.config, ctx)?;
    for (index, package) in packages.iter().enumerate() {
        let fetched = fetcher.fetch(package).await?;
        let path = write_package(&loaded.project_root, &fetched).await?;
        ctx.output
            .info(&format!("  [{}/{}] {} → {}", index + 1, packages.len(), package, path));
    }

    ctx.output.success(&format!(
        "Installed {} packages in {:.2}s",
        packages.len(),
        start_time.elapsed().as_secs_f64()
    ));
    Ok(())
}

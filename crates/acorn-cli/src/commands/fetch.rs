//! `acorn fetch` command implementation.
//!
//! Fetches one package and writes its tarball to the addon layout.

use acorn_core::error::{AcornError, AcornResult};
use acorn_core::Package;

use super::{package_fetcher, write_package, CommandContext};

/// Execute the `acorn fetch` command
pub async fn execute(
    name: String,
    version: String,
    indirect: bool,
    ctx: &CommandContext,
) -> AcornResult<()> {
    if !Package::is_valid_name(&name) {
        return Err(AcornError::ConfigValidation {
            field: "name".to_string(),
            reason: format!("'{}' is not a valid npm package name", name),
        });
    }

    let package = Package::new(name, version, indirect);
    let loaded = ctx.load_config().await?;
    let fetcher = package_fetcher(&loaded.config, ctx)?;

    let fetched = fetcher.fetch(&package).await?;
    let path = write_package(&loaded.project_root, &fetched).await?;

    ctx.output.success(&format!(
        "{} → {} ({} bytes)",
        package,
        path,
        fetched.bytes.len()
    ));
    Ok(())
}

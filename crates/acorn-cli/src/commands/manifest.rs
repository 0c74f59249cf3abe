//! `acorn manifest` command implementation.

use acorn_core::error::AcornResult;

use super::{registry_client, CommandContext};

/// Execute the `acorn manifest` command.
///
/// Uses the lenient lookup: registry failures are reported through the
/// observer and leave an empty URL, which is a warning rather than an error.
pub async fn execute(name: String, version: String, ctx: &CommandContext) -> AcornResult<()> {
    let loaded = ctx.load_config().await?;
    let registry = registry_client(&loaded.config, ctx)?;

    let tarball_url = registry.get_tarball_url(&name, &version).await;
    if tarball_url.is_empty() {
        ctx.output.warn(&format!(
            "No tarball URL for {}@{} on {}",
            name,
            version,
            registry.host()
        ));
    } else {
        ctx.output.result(&tarball_url);
    }

    Ok(())
}

//! Package fetch orchestration: resolve → split → download → place

use std::sync::Arc;

use acorn_core::error::AcornError;
use acorn_core::utils::verify_integrity;
use acorn_core::{split_url, AddonLayout, Package};
use camino::Utf8PathBuf;
use tracing::{debug, info};

use crate::client::RegistryClient;
use crate::events::{FetchObserver, TracingObserver};
use crate::http::HttpClient;
use crate::RegistryResult;

/// A downloaded tarball and where it belongs.
///
/// Writing `bytes` to `destination` and extracting the archive are up to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPackage {
    pub package: Package,
    pub tarball_url: String,
    pub bytes: Vec<u8>,
    /// Relative to the project root
    pub destination: Utf8PathBuf,
}

/// Fetches single packages from a registry
#[derive(Clone)]
pub struct PackageFetcher {
    registry: RegistryClient,
    /// Used for tarball downloads
    http: HttpClient,
    layout: AddonLayout,
    verify_integrity: bool,
    observer: Arc<dyn FetchObserver>,
}

impl PackageFetcher {
    /// Downloads go through the registry client's HTTP client
    pub fn new(registry: RegistryClient) -> Self {
        let http = registry.http().clone();
        Self {
            registry,
            http,
            layout: AddonLayout::default(),
            verify_integrity: false,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_http(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    pub fn with_layout(mut self, layout: AddonLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Check downloads against the manifest's `integrity`/`shasum`
    pub fn with_integrity_check(mut self, enabled: bool) -> Self {
        self.verify_integrity = enabled;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn layout(&self) -> &AddonLayout {
        &self.layout
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Fetch one package's tarball.
    ///
    /// Announces the operation before starting and reports any failure, with
    /// its stage and host, through the observer.
    pub async fn fetch(&self, package: &Package) -> RegistryResult<FetchedPackage> {
        let operation = package.to_string();
        self.observer.operation_started(&operation);

        match self.run(package).await {
            Ok(fetched) => {
                info!(
                    package = %operation,
                    bytes = fetched.bytes.len(),
                    destination = %fetched.destination,
                    "Fetched package"
                );
                Ok(fetched)
            },
            Err(err) => {
                let stage = err.stage().map_or_else(|| "fetch".to_string(), |s| s.to_string());
                let host = err.host().unwrap_or_else(|| self.registry.host());
                self.observer.message_logged(&format!(
                    "Failed to fetch {} ({} stage, host {}): {}",
                    operation, stage, host, err
                ));
                Err(err)
            },
        }
    }

    async fn run(&self, package: &Package) -> RegistryResult<FetchedPackage> {
        let tarball = self
            .registry
            .resolve_tarball(&package.name, &package.version)
            .await?;

        let target = split_url(&tarball.url);
        if !target.is_connectable() {
            return Err(AcornError::InvalidTarballUrl {
                name: package.name.clone(),
                version: package.version.clone(),
                url: tarball.url,
            });
        }

        let scheme = tarball.url.split_once("://").map_or("", |(scheme, _)| scheme);
        debug!(host = %target.host, path = %target.path, scheme, "Downloading tarball");
        let bytes = self
            .http
            .for_scheme(scheme)
            .get(&target.host, &target.path, &[200])
            .await?;

        if self.verify_integrity {
            verify_integrity(
                &package.to_string(),
                &bytes,
                tarball.integrity.as_deref(),
                tarball.shasum.as_deref(),
            )?;
        }

        Ok(FetchedPackage {
            package: package.clone(),
            tarball_url: tarball.url,
            bytes,
            destination: package.destination_path(&self.layout),
        })
    }
}

#[cfg(test)]
mod tests;

//! Registry client: manifest lookup and tarball resolution

use std::sync::Arc;

use acorn_core::error::AcornError;
use tracing::debug;

use crate::api::{Manifest, TarballRef};
use crate::events::{FetchObserver, TracingObserver};
use crate::http::HttpClient;
use crate::RegistryResult;

/// Public npm registry
pub const DEFAULT_REGISTRY_HOST: &str = "registry.npmjs.org";

/// Client for one npm-compatible registry
#[derive(Clone)]
pub struct RegistryClient {
    http: HttpClient,
    /// Registry authority, `host[:port]`
    host: String,
    observer: Arc<dyn FetchObserver>,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("host", &self.host)
            .field("http", &self.http)
            .finish()
    }
}

impl RegistryClient {
    /// Client for the public registry
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            host: DEFAULT_REGISTRY_HOST.to_string(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Use a different registry host, e.g. a mirror
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Request path of a version manifest; scoped names keep their `/`
    pub fn manifest_path(name: &str, version: &str) -> String {
        format!("/{}/{}", name, version)
    }

    /// Fetch and decode the manifest of one exact version
    pub async fn fetch_manifest(&self, name: &str, version: &str) -> RegistryResult<Manifest> {
        let path = Self::manifest_path(name, version);
        debug!(host = %self.host, %path, "Fetching manifest");
        let body = self.http.get(&self.host, &path, &[200]).await?;
        Manifest::from_slice(&body)
    }

    /// Manifest of one version, or an empty manifest on any failure.
    ///
    /// Failures are reported through the observer, never returned.
    pub async fn get_manifest(&self, name: &str, version: &str) -> Manifest {
        match self.fetch_manifest(name, version).await {
            Ok(manifest) => manifest,
            Err(err) => {
                self.observer.message_logged(&format!(
                    "Manifest for {}@{} from {} unavailable ({}): {}",
                    name,
                    version,
                    self.host,
                    err.stage().map_or_else(|| "fetch".to_string(), |stage| stage.to_string()),
                    err
                ));
                Manifest::empty()
            },
        }
    }

    /// `dist.tarball` of a version, or `""` when it cannot be found
    pub async fn get_tarball_url(&self, name: &str, version: &str) -> String {
        let manifest = self.get_manifest(name, version).await;
        if manifest.is_empty() {
            return String::new();
        }
        manifest.tarball_url().to_string()
    }

    /// Resolve the tarball of a version, keeping "does not exist" apart from
    /// network and decode failures
    pub async fn resolve_tarball(&self, name: &str, version: &str) -> RegistryResult<TarballRef> {
        let not_found = || AcornError::PackageNotFound {
            name: name.to_string(),
            version: version.to_string(),
        };

        let manifest = match self.fetch_manifest(name, version).await {
            Ok(manifest) => manifest,
            Err(AcornError::UnexpectedStatus { status: 404, .. }) => return Err(not_found()),
            Err(err) => return Err(err),
        };
        if manifest.is_empty() {
            return Err(not_found());
        }

        manifest.tarball_ref().ok_or_else(|| AcornError::TarballNotFound {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}

#[cfg(test)]
mod tests;

//! acorn.toml configuration parsing and serialization

use std::collections::BTreeMap;
use std::time::Duration;

use acorn_core::error::AcornError;
use acorn_core::utils::is_safe_path;
use acorn_core::{AddonLayout, Package};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Public npm registry
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Complete acorn.toml configuration; every section is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcornToml {
    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub fetch: FetchSection,

    /// Directly declared addons, name → exact version
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Transitive addons, name → exact version
    #[serde(default, rename = "indirect-dependencies")]
    pub indirect_dependencies: BTreeMap<String, String>,
}

/// Registry section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Registry origin; the scheme picks TLS, an explicit port is honoured
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// User agent override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Fetch section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    /// Root of directly declared addons, relative to the project
    pub addons_dir: Utf8PathBuf,
    /// Shared directory for indirect dependencies, inside `addons_dir`
    pub deps_dir: String,
    /// Wall-clock limit per request
    pub timeout_secs: u64,
    /// Poll ticks a request may spend without progress
    pub max_poll_ticks: u64,
    /// Length of one scheduler tick; 0 yields instead of sleeping
    pub frame_interval_ms: u64,
    /// Check tarballs against the manifest's integrity data
    pub verify_integrity: bool,
}

/// Where and how to reach the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    /// Host name or IP literal, without port
    pub host: String,
    pub port: u16,
    /// `https` rather than `http`
    pub secure: bool,
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            user_agent: None,
        }
    }
}

impl Default for FetchSection {
    fn default() -> Self {
        let layout = AddonLayout::default();
        Self {
            addons_dir: layout.addons_dir,
            deps_dir: layout.deps_dir,
            timeout_secs: 60,
            max_poll_ticks: 100_000,
            frame_interval_ms: 5,
            verify_integrity: false,
        }
    }
}

impl RegistrySection {
    /// Parse the registry URL into connection settings
    pub fn endpoint(&self) -> ConfigResult<RegistryEndpoint> {
        let invalid = |reason: String| AcornError::ConfigValidation {
            field: "registry.url".to_string(),
            reason,
        };

        let url = url::Url::parse(&self.url).map_err(|e| invalid(format!("'{}': {}", self.url, e)))?;
        let secure = match url.scheme() {
            "https" => true,
            "http" => false,
            other => return Err(invalid(format!("unsupported scheme '{}'", other))),
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid(format!("'{}' has no host", self.url)))?;
        let port = url
            .port_or_known_default()
            .unwrap_or(if secure { 443 } else { 80 });

        Ok(RegistryEndpoint {
            host: host.to_string(),
            port,
            secure,
        })
    }
}

impl FetchSection {
    pub fn layout(&self) -> AddonLayout {
        AddonLayout::new(self.addons_dir.clone(), self.deps_dir.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl AcornToml {
    /// Every configured package, direct ones first, each group in name order
    pub fn packages(&self) -> Vec<Package> {
        let direct = self
            .dependencies
            .iter()
            .map(|(name, version)| Package::direct(name.as_str(), version.as_str()));
        let indirect = self
            .indirect_dependencies
            .iter()
            .map(|(name, version)| Package::indirect(name.as_str(), version.as_str()));
        direct.chain(indirect).collect()
    }
}

/// Parse TOML string to AcornToml configuration
pub fn parse_acorn_toml(content: &str) -> ConfigResult<AcornToml> {
    // Syntax first, for precise error positions
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| toml_error(content, e.message(), e.span()))?;

    let config: AcornToml = toml::from_str(content)
        .map_err(|e| toml_error(content, e.message(), e.span()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Parse TOML string into an untyped table, checking it is a valid config first
pub fn parse_table(content: &str) -> ConfigResult<toml::Table> {
    parse_acorn_toml(content)?;
    toml::from_str(content).map_err(|e| toml_error(content, e.message(), e.span()))
}

/// Serialize AcornToml to TOML string
pub fn serialize_acorn_toml(config: &AcornToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| AcornError::ConfigValidation {
        field: "acorn.toml".to_string(),
        reason: format!("serialization failed: {}", e),
    })
}

/// Validate configuration values
pub fn validate_config(config: &AcornToml) -> ConfigResult<()> {
    config.registry.endpoint()?;

    if let Some(user_agent) = &config.registry.user_agent {
        if user_agent.trim().is_empty() || user_agent.chars().any(char::is_control) {
            return Err(invalid("registry.user_agent", "must be non-empty printable text"));
        }
    }

    let fetch = &config.fetch;
    if fetch.addons_dir.as_str().is_empty() || !is_safe_path(fetch.addons_dir.as_std_path()) {
        return Err(invalid(
            "fetch.addons_dir",
            "must be a relative path inside the project",
        ));
    }
    if fetch.deps_dir.is_empty() || !is_plain_segment(&fetch.deps_dir) {
        return Err(invalid("fetch.deps_dir", "must be a single directory name"));
    }
    if fetch.timeout_secs == 0 {
        return Err(invalid("fetch.timeout_secs", "must be greater than 0"));
    }
    if fetch.max_poll_ticks == 0 {
        return Err(invalid("fetch.max_poll_ticks", "must be greater than 0"));
    }

    for (section, deps) in [
        ("dependencies", &config.dependencies),
        ("indirect-dependencies", &config.indirect_dependencies),
    ] {
        for (name, version) in deps {
            validate_dependency(section, name, version)?;
        }
    }

    Ok(())
}

/// Load and parse acorn.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<AcornToml> {
    let content = read_file(path).await?;
    parse_acorn_toml(&content).map_err(|e| in_file(path, e))
}

/// Load acorn.toml from file path as an untyped table for layering
pub async fn load_table_from_file(path: &Utf8Path) -> ConfigResult<toml::Table> {
    let content = read_file(path).await?;
    parse_table(&content).map_err(|e| in_file(path, e))
}

async fn read_file(path: &Utf8Path) -> ConfigResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AcornError::io(format!("Failed to read {}", path), e))
}

fn in_file(path: &Utf8Path, err: AcornError) -> AcornError {
    match err {
        AcornError::TomlParse {
            message,
            line,
            column,
        } => AcornError::TomlParse {
            message: format!("in {}: {}", path, message),
            line,
            column,
        },
        AcornError::ConfigValidation { field, reason } => AcornError::ConfigValidation {
            field,
            reason: format!("{} (in {})", reason, path),
        },
        other => other,
    }
}

fn validate_dependency(section: &str, name: &str, version: &str) -> ConfigResult<()> {
    if !Package::is_valid_name(name) {
        return Err(invalid(
            &format!("{}.{}", section, name),
            "not a valid npm package name",
        ));
    }
    if version.trim().is_empty() || version.contains(&['/', '\\'][..]) {
        return Err(invalid(
            &format!("{}.{}", section, name),
            "version must be a non-empty exact version",
        ));
    }
    Ok(())
}

fn is_plain_segment(segment: &str) -> bool {
    !matches!(segment, "." | "..") && !segment.contains(&['/', '\\'][..])
}

fn invalid(field: &str, reason: &str) -> AcornError {
    AcornError::ConfigValidation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Turn a parser error into `TomlParse` with a 1-based line and column
fn toml_error(content: &str, message: &str, span: Option<std::ops::Range<usize>>) -> AcornError {
    let (line, column) = span
        .map(|span| line_column(content, span.start))
        .unwrap_or((0, 0));
    AcornError::TomlParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = content.get(..offset).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |newline| before[newline + 1..].chars().count())
        + 1;
    (line, column)
}

//! Configuration layering, fallback logic, and environment overrides

use std::collections::HashMap;

use acorn_core::error::AcornError;
use camino::{Utf8Path, Utf8PathBuf};

use crate::toml::{validate_config, AcornToml};
use crate::ConfigResult;

/// Project configuration file
pub const CONFIG_FILE: &str = "acorn.toml";
/// npm manifest used when there is no acorn.toml
pub const PACKAGE_JSON_FILE: &str = "package.json";
/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "ACORN_";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Project acorn.toml file
    ProjectToml(Utf8PathBuf),
    /// Project package.json file (fallback)
    ProjectJson(Utf8PathBuf),
    /// No project file; built-in defaults
    Defaults,
}

impl ConfigSource {
    /// File the configuration came from, if any
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            ConfigSource::ProjectToml(path) | ConfigSource::ProjectJson(path) => {
                Some(path.as_path())
            },
            ConfigSource::Defaults => None,
        }
    }
}

/// Fully layered configuration plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: AcornToml,
    pub source: ConfigSource,
    /// Directory downloads are placed relative to
    pub project_root: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }

    /// Load every layer: global file, project file, environment, CLI flags
    pub async fn load(&self, cli_overrides: HashMap<String, String>) -> ConfigResult<LoadedConfig> {
        let global = self.load_global_config().await?;
        let (project, source) = self.load_project_config().await?;
        let config = ConfigLayering::merge_configs(
            global,
            project,
            ConfigLayering::collect_env_overrides(),
            cli_overrides,
        )?;

        let project_root = source
            .path()
            .and_then(Utf8Path::parent)
            .map_or_else(|| self.cwd.clone(), Utf8Path::to_path_buf);

        Ok(LoadedConfig {
            config,
            source,
            project_root,
        })
    }

    /// Load project configuration with fallbacks
    pub async fn load_project_config(&self) -> ConfigResult<(toml::Table, ConfigSource)> {
        // First, try to find acorn.toml
        if let Some(path) = self.resolve_config_path(CONFIG_FILE) {
            let table = crate::toml::load_table_from_file(&path).await?;
            return Ok((table, ConfigSource::ProjectToml(path)));
        }

        // Fall back to package.json if no acorn.toml
        if let Some(path) = self.resolve_config_path(PACKAGE_JSON_FILE) {
            let package_json = crate::json::load_from_file(&path).await?;
            let table = crate::json::import_to_table(&package_json)?;
            return Ok((table, ConfigSource::ProjectJson(path)));
        }

        Ok((toml::Table::new(), ConfigSource::Defaults))
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(filename))
            .find(|path| path.is_file())
    }

    /// Load global configuration from `~/.acorn/config.toml`
    pub async fn load_global_config(&self) -> ConfigResult<Option<toml::Table>> {
        let Some(path) = global_config_path()? else {
            return Ok(None);
        };

        if path.is_file() {
            let table = crate::toml::load_table_from_file(&path).await?;
            Ok(Some(table))
        } else {
            Ok(None)
        }
    }
}

/// Location of the global configuration; `None` without a home directory
pub fn global_config_path() -> ConfigResult<Option<Utf8PathBuf>> {
    let Some(home_dir) = dirs::home_dir() else {
        return Ok(None);
    };

    let home = Utf8PathBuf::try_from(home_dir).map_err(|e| AcornError::ConfigValidation {
        field: "home_dir".to_string(),
        reason: format!("Invalid home directory path: {}", e),
    })?;

    Ok(Some(home.join(".acorn").join("config.toml")))
}

impl ConfigLayering {
    /// Merge multiple configuration layers.
    ///
    /// Project keys override global keys table by table; environment
    /// overrides come next and CLI flags win over everything.
    pub fn merge_configs(
        global_config: Option<toml::Table>,
        project_config: toml::Table,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<AcornToml> {
        let mut merged = global_config.unwrap_or_default();
        merge_tables(&mut merged, project_config);

        let mut config: AcornToml = toml::Value::Table(merged).try_into().map_err(
            |e: toml::de::Error| AcornError::ConfigValidation {
                field: "config".to_string(),
                reason: e.message().to_string(),
            },
        )?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut config, &env_overrides)?;

        // Apply CLI flag overrides (highest priority)
        Self::apply_cli_overrides(&mut config, &cli_overrides);

        validate_config(&config)?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(
        config: &mut AcornToml,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "ACORN_REGISTRY_URL" => config.registry.url = value.clone(),
                "ACORN_USER_AGENT" => config.registry.user_agent = Some(value.clone()),
                "ACORN_ADDONS_DIR" => config.fetch.addons_dir = Utf8PathBuf::from(value),
                "ACORN_TIMEOUT_SECS" => {
                    config.fetch.timeout_secs =
                        value.trim().parse().map_err(|e| AcornError::ConfigValidation {
                            field: key.clone(),
                            reason: format!("expected a number of seconds: {}", e),
                        })?;
                },
                "ACORN_VERIFY_INTEGRITY" => {
                    config.fetch.verify_integrity =
                        parse_flag(value).ok_or_else(|| AcornError::ConfigValidation {
                            field: key.clone(),
                            reason: format!("expected true or false, got '{}'", value),
                        })?;
                },
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(config: &mut AcornToml, overrides: &HashMap<String, String>) {
        for (key, value) in overrides {
            match key.as_str() {
                "registry" => config.registry.url = value.clone(),
                "addons-dir" => config.fetch.addons_dir = Utf8PathBuf::from(value),
                _ => {
                    // Unknown CLI override, ignore
                },
            }
        }
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

/// Recursively merge `overlay` into `base`; overlay wins on conflicts
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            },
            (_, value) => {
                base.insert(key, value);
            },
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

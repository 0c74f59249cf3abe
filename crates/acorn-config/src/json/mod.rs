//! package.json fallback: direct dependencies of an npm project

use std::collections::BTreeMap;

use acorn_core::error::AcornError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::toml::{validate_config, AcornToml};
use crate::ConfigResult;

/// The parts of package.json that matter for fetching addons
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Runtime dependencies; values are usually version strings
    #[serde(default)]
    pub dependencies: Map<String, Value>,
}

impl PackageJson {
    /// Dependencies that can be fetched from a registry.
    ///
    /// Non-string values and local, git, URL and workspace specs are skipped.
    pub fn registry_dependencies(&self) -> BTreeMap<String, String> {
        self.dependencies
            .iter()
            .filter_map(|(name, spec)| {
                let version = spec.as_str()?.trim();
                (!version.is_empty() && !is_non_registry_spec(version))
                    .then(|| (name.clone(), version.to_string()))
            })
            .collect()
    }
}

fn is_non_registry_spec(spec: &str) -> bool {
    const PREFIXES: [&str; 8] = [
        "file:",
        "link:",
        "workspace:",
        "git:",
        "git+",
        "github:",
        "http:",
        "https:",
    ];
    PREFIXES.iter().any(|prefix| spec.starts_with(prefix))
}

/// Parse JSON string to PackageJson
pub fn parse_package_json(content: &str) -> ConfigResult<PackageJson> {
    serde_json::from_str(content).map_err(|e| AcornError::JsonParse {
        message: format!("JSON parsing error: {}", e),
    })
}

/// Convert PackageJson to an AcornToml holding its direct dependencies
pub fn import_to_acorn_toml(package_json: &PackageJson) -> ConfigResult<AcornToml> {
    let config = AcornToml {
        dependencies: package_json.registry_dependencies(),
        ..AcornToml::default()
    };
    validate_config(&config)?;
    Ok(config)
}

/// Dependencies of package.json as a table for layering
pub fn import_to_table(package_json: &PackageJson) -> ConfigResult<toml::Table> {
    let config = import_to_acorn_toml(package_json)?;
    let dependencies = config
        .dependencies
        .into_iter()
        .map(|(name, version)| (name, toml::Value::String(version)))
        .collect();

    let mut table = toml::Table::new();
    table.insert("dependencies".to_string(), toml::Value::Table(dependencies));
    Ok(table)
}

/// Load and parse package.json from file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<PackageJson> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AcornError::io(format!("Failed to read {}", path), e))?;

    parse_package_json(&content).map_err(|e| match e {
        AcornError::JsonParse { message } => AcornError::JsonParse {
            message: format!("In file {}: {}", path, message),
        },
        other => other,
    })
}

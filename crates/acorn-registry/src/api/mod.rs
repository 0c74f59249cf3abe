//! npm registry API response types

use acorn_core::error::{AcornError, AcornResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Manifest of one package version, as served by `GET /{name}/{version}`.
///
/// Kept as a generic JSON object: only `dist.tarball` is required, every
/// other field is passed through untouched. Missing keys read as absent,
/// never as an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Map<String, Value>);

/// Distribution information for package tarball
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DistInfo {
    /// Tarball download URL
    #[serde(default)]
    pub tarball: String,
    /// SHA-1 checksum (legacy)
    pub shasum: Option<String>,
    /// Subresource integrity hash (preferred)
    pub integrity: Option<String>,
    /// Unpacked size in bytes
    #[serde(rename = "unpackedSize")]
    pub unpacked_size: Option<u64>,
    /// File count
    #[serde(rename = "fileCount")]
    pub file_count: Option<u32>,
}

/// A resolved tarball location plus whatever integrity data the manifest had
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarballRef {
    pub url: String,
    pub shasum: Option<String>,
    pub integrity: Option<String>,
}

impl Manifest {
    /// Manifest with no fields; what lenient lookups return on failure
    pub fn empty() -> Self {
        Self(Map::new())
    }

    /// Decode a response body: UTF-8 text holding a top-level JSON object
    pub fn from_slice(body: &[u8]) -> AcornResult<Self> {
        let text = std::str::from_utf8(body).map_err(|e| AcornError::Decode {
            message: format!("body is not valid UTF-8: {}", e),
        })?;
        Self::parse(text)
    }

    /// Decode JSON text that must hold an object
    pub fn parse(text: &str) -> AcornResult<Self> {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(AcornError::Decode {
                message: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(AcornError::Decode {
                message: format!("invalid JSON: {}", e),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// Follow a chain of object keys; any miss along the way yields `None`
    pub fn lookup(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.0.get(*first)?, |value, key| value.get(*key))
    }

    /// String at a key path, or `""` when absent or not a string
    pub fn get_str(&self, path: &[&str]) -> &str {
        self.lookup(path).and_then(Value::as_str).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.get_str(&["name"])
    }

    pub fn version(&self) -> &str {
        self.get_str(&["version"])
    }

    /// `dist.tarball`, or `""`
    pub fn tarball_url(&self) -> &str {
        self.get_str(&["dist", "tarball"])
    }

    /// Typed view of the `dist` object, if it is well-formed
    pub fn dist(&self) -> Option<DistInfo> {
        serde_json::from_value(self.lookup(&["dist"])?.clone()).ok()
    }

    /// Tarball location with integrity data, if the manifest names a tarball
    pub fn tarball_ref(&self) -> Option<TarballRef> {
        let url = self.tarball_url();
        if url.is_empty() {
            return None;
        }

        let non_empty = |path: &[&str]| {
            let value = self.get_str(path);
            (!value.is_empty()).then(|| value.to_string())
        };

        Some(TarballRef {
            url: url.to_string(),
            shasum: non_empty(&["dist", "shasum"]),
            integrity: non_empty(&["dist", "integrity"]),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Configuration parsing for Acorn
//!
//! This crate handles parsing and validation of acorn.toml and package.json files,
//! layering the global config, project file, environment and command line into
//! one `AcornToml`.

pub mod json;
pub mod merge;
pub mod toml;

// Re-export main types
pub use json::PackageJson;
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, LoadedConfig};
pub use crate::toml::{AcornToml, FetchSection, RegistryEndpoint, RegistrySection};

use acorn_core::error::AcornError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, AcornError>;

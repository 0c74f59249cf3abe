//! Error types and result aliases for Acorn operations.
//!
//! Provides a unified error type that covers every failure a single package
//! fetch can run into, grouped into a small taxonomy (`ErrorKind`) so callers
//! can tell network faults apart from "this package/version does not exist".

use std::fmt;
use thiserror::Error;

/// Unified error type for all Acorn operations
#[derive(Error, Debug)]
pub enum AcornError {
    // Network errors
    #[error("Failed to connect to {host}: {message}")]
    Connection { host: String, message: String },

    #[error("Protocol error from {host}{path}: {message}")]
    Protocol {
        host: String,
        path: String,
        message: String,
    },

    #[error("Unexpected HTTP status {status} from {host}{path}")]
    UnexpectedStatus {
        host: String,
        path: String,
        status: u16,
    },

    #[error("Timed out during {stage} with {host} after {ticks} ticks")]
    Timeout {
        host: String,
        stage: FetchStage,
        ticks: u64,
    },

    #[error("Request to {host} cancelled during {stage}")]
    Cancelled { host: String, stage: FetchStage },

    // Registry errors
    #[error("Failed to decode registry response: {message}")]
    Decode { message: String },

    #[error("Package '{name}@{version}' not found in registry")]
    PackageNotFound { name: String, version: String },

    #[error("No tarball listed for '{name}@{version}' in registry manifest")]
    TarballNotFound { name: String, version: String },

    #[error("Tarball URL '{url}' for '{name}@{version}' has no host")]
    InvalidTarballUrl {
        name: String,
        version: String,
        url: String,
    },

    #[error("Integrity check failed for {package}: expected {expected}, got {actual}")]
    IntegrityFailure {
        package: String,
        expected: String,
        actual: String,
    },

    // Config errors
    #[error("Failed to parse acorn.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Failed to parse package.json: {message}")]
    JsonParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Acorn operations
pub type AcornResult<T> = Result<T, AcornError>;

/// Coarse classification of an [`AcornError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The transport never reached a connected state
    Connection,
    /// Unexpected transport status or HTTP status code
    Protocol,
    /// Response body was not a JSON object
    Decode,
    /// The registry has no such package/version or no tarball for it
    Resolution,
    Timeout,
    Cancelled,
    Integrity,
    Config,
    Io,
}

/// Stage of a fetch at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Connect,
    Request,
    Status,
    Body,
    Decode,
    Resolve,
    Verify,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchStage::Connect => "connect",
            FetchStage::Request => "request",
            FetchStage::Status => "status",
            FetchStage::Body => "body",
            FetchStage::Decode => "decode",
            FetchStage::Resolve => "resolve",
            FetchStage::Verify => "verify",
        };
        f.write_str(name)
    }
}

impl AcornError {
    /// Create a connection error for a host
    pub fn connection(host: &str, message: impl Into<String>) -> Self {
        Self::Connection {
            host: host.to_string(),
            message: message.into(),
        }
    }

    /// Create a protocol error for a request
    pub fn protocol(host: &str, path: &str, message: impl Into<String>) -> Self {
        Self::Protocol {
            host: host.to_string(),
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AcornError::Connection { .. } => ErrorKind::Connection,
            AcornError::Protocol { .. } | AcornError::UnexpectedStatus { .. } => {
                ErrorKind::Protocol
            },
            AcornError::Timeout { .. } => ErrorKind::Timeout,
            AcornError::Cancelled { .. } => ErrorKind::Cancelled,
            AcornError::Decode { .. } => ErrorKind::Decode,
            AcornError::PackageNotFound { .. }
            | AcornError::TarballNotFound { .. }
            | AcornError::InvalidTarballUrl { .. } => ErrorKind::Resolution,
            AcornError::IntegrityFailure { .. } => ErrorKind::Integrity,
            AcornError::TomlParse { .. }
            | AcornError::JsonParse { .. }
            | AcornError::ConfigValidation { .. } => ErrorKind::Config,
            AcornError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Stage of the fetch this error belongs to, if it came from one
    pub fn stage(&self) -> Option<FetchStage> {
        match self {
            AcornError::Connection { .. } => Some(FetchStage::Connect),
            AcornError::Protocol { .. } => Some(FetchStage::Request),
            AcornError::UnexpectedStatus { .. } => Some(FetchStage::Status),
            AcornError::Timeout { stage, .. } | AcornError::Cancelled { stage, .. } => {
                Some(*stage)
            },
            AcornError::Decode { .. } => Some(FetchStage::Decode),
            AcornError::PackageNotFound { .. }
            | AcornError::TarballNotFound { .. }
            | AcornError::InvalidTarballUrl { .. } => Some(FetchStage::Resolve),
            AcornError::IntegrityFailure { .. } => Some(FetchStage::Verify),
            _ => None,
        }
    }

    /// Host involved in a network failure
    pub fn host(&self) -> Option<&str> {
        match self {
            AcornError::Connection { host, .. }
            | AcornError::Protocol { host, .. }
            | AcornError::UnexpectedStatus { host, .. }
            | AcornError::Timeout { host, .. }
            | AcornError::Cancelled { host, .. } => Some(host),
            _ => None,
        }
    }

    /// Check if retrying (possibly against a mirror) could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Connection | ErrorKind::Timeout | ErrorKind::Io)
    }

    /// Check if this error means the package/version does not exist
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::Resolution
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            AcornError::PackageNotFound { .. } => {
                Some("Check the package name and version, or search the registry")
            },
            AcornError::TarballNotFound { .. } | AcornError::InvalidTarballUrl { .. } => {
                Some("The registry manifest is incomplete; try another version or registry")
            },
            AcornError::Connection { .. } => {
                Some("Check your internet connection or configure a mirror registry")
            },
            AcornError::Timeout { .. } => {
                Some("The host did not respond in time; raise fetch.timeout_secs or retry")
            },
            AcornError::IntegrityFailure { .. } => {
                Some("The download is corrupted or was tampered with; retry the fetch")
            },
            AcornError::ConfigValidation { .. } | AcornError::TomlParse { .. } => {
                Some("Fix acorn.toml and run the command again")
            },
            _ => None,
        }
    }
}

//! npm registry client for Acorn
//!
//! This crate resolves a single `(name, version)` pair against an
//! npm-compatible registry and downloads its tarball. Networking goes
//! through a poll-driven HTTP client state machine that is written against
//! a small transport interface and suspends cooperatively between polls.

pub mod api;
pub mod client;
pub mod events;
pub mod fetch;
pub mod http;

// Re-export main types
pub use api::{DistInfo, Manifest, TarballRef};
pub use client::{RegistryClient, DEFAULT_REGISTRY_HOST};
pub use events::{EventBus, FetchObserver, TracingObserver};
pub use fetch::{FetchedPackage, PackageFetcher};
pub use http::{
    AttemptStatus, Connector, FrameScheduler, HttpClient, HttpConfig, ReqwestConnector, Scheduler,
    TlsMode, Transport, TransportStatus,
};

use acorn_core::error::AcornError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, AcornError>;

//! # acorn-core
//!
//! Core types and utilities shared across all Acorn crates.
//!
//! This crate provides:
//! - `Package` identity and addon destination-path computation
//! - `AcornError` enum for unified error handling
//! - URL splitting, safe path joining and integrity helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Package, AddonLayout)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{AcornError, AcornResult, ErrorKind, FetchStage};
pub use types::{AddonLayout, Package};
pub use utils::{split_url, HostPath};

//! Core data types for Acorn.
//!
//! This module provides the fundamental types used throughout Acorn:
//! - Package identity (name, version, direct/indirect)
//! - Addon directory layout used to place downloaded tarballs

pub mod package;

// Re-export all public types
pub use package::{AddonLayout, Package};

//! Utility functions and helpers.
//!
//! Common functionality used across multiple Acorn crates.

pub mod hash;
pub mod path;
pub mod url;

// Re-export commonly used utilities
pub use hash::verify_integrity;
pub use path::{is_safe_path, normalize_path, safe_join};
pub use url::{split_url, HostPath};

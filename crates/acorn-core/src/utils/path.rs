//! Path utilities for safe file system operations.
//!
//! Destination paths are built from registry-controlled strings (package
//! names and versions), so they are checked before anything is written.

use crate::error::{AcornError, AcornResult};
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                // Leading .. cannot be resolved and is kept
                match components.last() {
                    Some(Component::Normal(_)) => {
                        components.pop();
                    },
                    _ => components.push(component),
                }
            },
            other => components.push(other),
        }
    }

    components.iter().collect()
}

/// Check if a relative path stays inside its base directory
pub fn is_safe_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => depth += 1,
            _ => return false,
        }
    }

    true
}

/// Join a relative path onto a base, refusing directory traversal
pub fn safe_join(base: &Path, path: &Path) -> AcornResult<PathBuf> {
    if !is_safe_path(path) {
        return Err(AcornError::ConfigValidation {
            field: "destination".to_string(),
            reason: format!("path '{}' escapes {}", path.display(), base.display()),
        });
    }

    Ok(base.join(normalize_path(path)))
}

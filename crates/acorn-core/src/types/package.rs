//! Package identity types.
//!
//! Defines the identity of a single dependency and where its downloaded
//! tarball lands inside the addons directory.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a dependency to fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    /// Registry name, possibly scoped (`@scope/name`)
    pub name: String,
    /// Exact version, passed to the registry verbatim
    pub version: String,
    /// True for transitive dependencies
    #[serde(default)]
    pub is_indirect: bool,
}

/// Directory layout for downloaded addons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonLayout {
    /// Root directory for directly declared addons
    pub addons_dir: Utf8PathBuf,
    /// Directory under `addons_dir` shared by indirect dependencies
    pub deps_dir: String,
}

impl Default for AddonLayout {
    fn default() -> Self {
        Self {
            addons_dir: Utf8PathBuf::from("addons"),
            deps_dir: "__deps".to_string(),
        }
    }
}

impl AddonLayout {
    /// Create a layout rooted at a custom addons directory
    pub fn new(addons_dir: impl Into<Utf8PathBuf>, deps_dir: impl Into<String>) -> Self {
        Self {
            addons_dir: addons_dir.into(),
            deps_dir: deps_dir.into(),
        }
    }

    /// Root shared by all indirect dependencies
    pub fn deps_root(&self) -> Utf8PathBuf {
        self.addons_dir.join(&self.deps_dir)
    }
}

impl Package {
    /// Create a package
    pub fn new(name: impl Into<String>, version: impl Into<String>, is_indirect: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            is_indirect,
        }
    }

    /// Create a directly declared dependency
    pub fn direct(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, version, false)
    }

    /// Create a transitive dependency
    pub fn indirect(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, version, true)
    }

    /// Name with any `@scope/` prefix stripped
    pub fn unscoped_name(&self) -> &str {
        match self.name.rsplit_once('/') {
            Some((_, unscoped)) => unscoped,
            None => &self.name,
        }
    }

    /// Check if the name carries a scope
    pub fn is_scoped(&self) -> bool {
        self.name.starts_with('@') && self.name.contains('/')
    }

    /// Where the downloaded tarball should be written, relative to the project root.
    ///
    /// Direct dependencies get a per-package directory; indirect ones live under a
    /// version-scoped directory inside the shared deps root.
    pub fn destination_path(&self, layout: &AddonLayout) -> Utf8PathBuf {
        let unscoped = self.unscoped_name();
        let base: Utf8PathBuf = if self.is_indirect {
            layout.deps_root().join(&self.version)
        } else {
            layout.addons_dir.clone()
        };

        base.join(unscoped).join(format!("{}.tar.gz", unscoped))
    }

    /// Directory the tarball would be extracted into
    pub fn install_dir(&self, layout: &AddonLayout) -> Utf8PathBuf {
        let destination = self.destination_path(layout);
        destination
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or(destination)
    }

    /// Check if this is a valid npm package name
    pub fn is_valid_name(name: &str) -> bool {
        if name.is_empty() || name.len() > 214 {
            return false;
        }

        match name.strip_prefix('@') {
            Some(scoped) => match scoped.split_once('/') {
                Some((scope, bare)) => is_valid_segment(scope) && is_valid_segment(bare),
                None => false,
            },
            None => is_valid_segment(name),
        }
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && !segment.starts_with('_')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

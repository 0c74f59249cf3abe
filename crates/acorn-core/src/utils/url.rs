//! URL decomposition into the host and request path used by the HTTP layer.
//!
//! The split is deliberately lenient: it never fails, the authority is kept
//! as an opaque string (userinfo and port included) and the path keeps any
//! query and fragment verbatim, since it becomes the request-line target.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A URL split into authority and request target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostPath {
    /// Authority component (`[userinfo@]host[:port]`), empty when absent
    pub host: String,
    /// Request target: path plus query and fragment
    pub path: String,
}

impl HostPath {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
        }
    }

    /// An empty host cannot be used to open a new connection
    pub fn is_connectable(&self) -> bool {
        !self.host.is_empty()
    }
}

impl fmt::Display for HostPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.host, self.path)
    }
}

/// Split `scheme://host/path?query#fragment` into host and path.
///
/// Input without an authority (no `//` after an optional scheme) yields an
/// empty host and the whole input as path.
pub fn split_url(url: &str) -> HostPath {
    let Some(rest) = strip_scheme(url) else {
        return HostPath::new("", url);
    };

    let authority_end = rest.find(&['/', '?', '#'][..]).unwrap_or(rest.len());
    let (host, target) = rest.split_at(authority_end);

    let path = if target.starts_with('/') {
        target.to_string()
    } else {
        // Origin-form request targets always start with a slash
        format!("/{}", target)
    };

    HostPath::new(host, path)
}

/// Return what follows `scheme://` (or a leading `//`), if the URL has an authority
fn strip_scheme(url: &str) -> Option<&str> {
    if let Some(rest) = url.strip_prefix("//") {
        return Some(rest);
    }

    let (scheme, rest) = url.split_once("://")?;
    if is_valid_scheme(scheme) {
        Some(rest)
    } else {
        None
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        },
        _ => false,
    }
}

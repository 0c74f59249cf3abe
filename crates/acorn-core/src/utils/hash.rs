//! Tarball integrity verification.
//!
//! Registry manifests describe a tarball with a Subresource Integrity string
//! (`dist.integrity`, e.g. `sha512-<base64>`) and a legacy hex SHA-1
//! (`dist.shasum`). The SRI string is preferred when both are present.

use crate::error::{AcornError, AcornResult};
use base64::{engine::general_purpose, Engine as _};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

/// Compute the lowercase hex SHA-1 of data
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Compute an SRI string (`<algorithm>-<base64>`) for data
pub fn sri(algorithm: &str, data: &[u8]) -> Option<String> {
    let digest = match algorithm {
        "sha512" => Sha512::digest(data).to_vec(),
        "sha256" => Sha256::digest(data).to_vec(),
        "sha1" => Sha1::digest(data).to_vec(),
        _ => return None,
    };
    Some(format!("{}-{}", algorithm, general_purpose::STANDARD.encode(digest)))
}

/// Verify downloaded bytes against the manifest's integrity fields.
///
/// Succeeds without checking anything when neither field is present or the
/// SRI algorithm is unknown and no shasum is available.
pub fn verify_integrity(
    package: &str,
    data: &[u8],
    integrity: Option<&str>,
    shasum: Option<&str>,
) -> AcornResult<()> {
    if let Some(expected) = integrity.filter(|s| !s.is_empty()) {
        // Several space-separated hashes may be listed; any match is enough
        let mut checked = None;
        for candidate in expected.split_whitespace() {
            let Some((algorithm, _)) = candidate.split_once('-') else {
                continue;
            };
            if let Some(actual) = sri(algorithm, data) {
                if actual == candidate {
                    return Ok(());
                }
                checked.get_or_insert(actual);
            }
        }
        if let Some(actual) = checked {
            return Err(AcornError::IntegrityFailure {
                package: package.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
    }

    if let Some(expected) = shasum.filter(|s| !s.is_empty()) {
        let actual = sha1_hex(data);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(AcornError::IntegrityFailure {
                package: package.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
    }

    Ok(())
}

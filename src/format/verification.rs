// src/format/verification.rs
// Decide whether an extracted side file is still current.

use log::{debug, trace};
use std::path::Path;

use super::checksums::{digests_match, sha256_file};
use super::zip_comment::read_fingerprint;
use crate::exceptions::JarpackError;

/// How an extracted file is matched against its package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// Producer timestamp stored as the ZIP archive comment
    Timestamp(u64),
    /// Expected SHA-256 of the whole file, hex
    Sha256(String),
}

/// Outcome of a freshness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid,
    /// The check itself failed; treated as [`Verification::Invalid`]
    Error(String),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }
}

/// Check `path` against `fingerprint`. A missing file is `Invalid`.
pub fn verify(path: &Path, fingerprint: &Fingerprint) -> Verification {
    let result = match fingerprint {
        Fingerprint::Sha256(expected) => verify_hash(path, expected),
        Fingerprint::Timestamp(expected) => verify_timestamp(path, *expected),
    };
    debug!("🔐 Verification of {}: {result:?}", path.display());
    result
}

fn verify_hash(path: &Path, expected: &str) -> Verification {
    if expected.trim().is_empty() {
        trace!("No expected hash, accepting {}", path.display());
        return Verification::Valid;
    }
    if !path.exists() {
        return Verification::Invalid;
    }
    match sha256_file(path) {
        Ok(actual) if digests_match(&actual, expected) => Verification::Valid,
        Ok(actual) => {
            trace!("Hash mismatch: {actual} != {expected}");
            Verification::Invalid
        }
        Err(e) => Verification::Error(e.to_string()),
    }
}

fn verify_timestamp(path: &Path, expected: u64) -> Verification {
    if !path.exists() {
        return Verification::Invalid;
    }
    match read_fingerprint(path) {
        Ok(actual) if actual == expected => Verification::Valid,
        Ok(actual) => {
            trace!("Timestamp mismatch: {actual} != {expected}");
            Verification::Invalid
        }
        Err(JarpackError::InvalidContainer(msg)) => {
            trace!("Not a fingerprinted archive: {msg}");
            Verification::Invalid
        }
        Err(e) => Verification::Error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::checksums::sha256_hex;
    use crate::format::zip_comment::tests::fake_zip;
    use tempfile::TempDir;

    #[test]
    fn test_empty_expected_hash_is_valid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.exe");
        assert_eq!(
            verify(&path, &Fingerprint::Sha256(String::new())),
            Verification::Valid
        );
    }

    #[test]
    fn test_hash_match_and_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tool.exe");
        std::fs::write(&path, b"tool bytes").unwrap();
        let digest = sha256_hex(b"tool bytes").to_uppercase();

        assert!(verify(&path, &Fingerprint::Sha256(digest)).is_valid());
        assert_eq!(
            verify(&path, &Fingerprint::Sha256("deadbeef".into())),
            Verification::Invalid
        );
    }

    #[test]
    fn test_timestamp_match() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.jar");
        std::fs::write(&path, fake_zip(32, &99u64.to_le_bytes())).unwrap();

        assert!(verify(&path, &Fingerprint::Timestamp(99)).is_valid());
        assert_eq!(
            verify(&path, &Fingerprint::Timestamp(100)),
            Verification::Invalid
        );
    }

    #[test]
    fn test_missing_or_unfingerprinted_file_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.jar");
        assert_eq!(
            verify(&path, &Fingerprint::Timestamp(1)),
            Verification::Invalid
        );

        std::fs::write(&path, b"not a zip at all").unwrap();
        assert_eq!(
            verify(&path, &Fingerprint::Timestamp(1)),
            Verification::Invalid
        );
    }
}

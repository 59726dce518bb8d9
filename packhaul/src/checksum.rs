//! SHA-256 checksum calculation and verification for downloaded archives.
//!
//! Checksums are streamed in fixed-size chunks so large archives never
//! have to fit in memory. Expected values are lowercase hex but compared
//! case-insensitively, since manifests in the wild carry both casings.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Errors from checksum calculation or verification.
///
/// `Clone` so a verification failure can be stored on a download task
/// and handed to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChecksumError {
    /// The file digest did not match the expected value.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    Mismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// The file could not be read.
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Calculate the SHA-256 checksum of a file.
///
/// # Returns
///
/// The lowercase hexadecimal SHA-256 hash of the file contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn file_sha256(path: &Path) -> Result<String, ChecksumError> {
    let mut file = File::open(path).map_err(|e| ChecksumError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| ChecksumError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify that a file matches an expected SHA-256 checksum.
///
/// The comparison is case-insensitive; the actual digest is always
/// reported in lowercase hex.
///
/// # Errors
///
/// Returns [`ChecksumError::Mismatch`] carrying both values if the digest
/// differs, or [`ChecksumError::Io`] if the file cannot be read.
pub fn verify(path: &Path, expected: &str) -> Result<(), ChecksumError> {
    let actual = file_sha256(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ChecksumError::Mismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_file_sha256() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let checksum = file_sha256(&file_path).unwrap();

        // SHA-256 of "hello world"
        assert_eq!(
            checksum,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_file_sha256_empty_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("empty.txt");

        File::create(&file_path).unwrap();

        let checksum = file_sha256(&file_path).unwrap();

        // SHA-256 of empty string
        assert_eq!(
            checksum,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_file_sha256_nonexistent_file() {
        let result = file_sha256(Path::new("/nonexistent/file.txt"));
        assert!(matches!(result, Err(ChecksumError::Io { .. })));
    }

    #[test]
    fn test_verify_match() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let result = verify(
            &file_path,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_verify_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let result = verify(
            &file_path,
            "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_verify_mismatch_carries_both_values() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let result = verify(&file_path, "deadbeef");
        match result {
            Err(ChecksumError::Mismatch {
                filename,
                expected,
                actual,
            }) => {
                assert_eq!(filename, "test.txt");
                assert_eq!(expected, "deadbeef");
                assert!(actual.starts_with("b94d27b9"));
            }
            other => panic!("expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_large_file_checksum_is_stable() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("large.bin");

        // Larger than the read buffer so the loop runs more than once
        let mut file = File::create(&file_path).unwrap();
        let data = vec![0xABu8; 200_000];
        file.write_all(&data).unwrap();

        let checksum = file_sha256(&file_path).unwrap();
        let checksum2 = file_sha256(&file_path).unwrap();
        assert_eq!(checksum, checksum2);
        assert_eq!(checksum.len(), 64);
    }
}

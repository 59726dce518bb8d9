//! On-disk install metadata, one file per installed package.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the metadata record inside each install directory.
pub const METADATA_FILE_NAME: &str = "packhaul.json";

/// Errors reading or writing install metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to access metadata at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("malformed metadata at {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// The authoritative record of what is installed in a directory.
///
/// Written as the final step of every install and update; its presence
/// and version field are what make a package "installed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallMetadata {
    pub version: String,
    pub install_path: PathBuf,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstallMetadata {
    /// The metadata file path inside an install directory.
    pub fn path_in(install_dir: &Path) -> PathBuf {
        install_dir.join(METADATA_FILE_NAME)
    }

    /// Read the metadata from an install directory.
    ///
    /// # Returns
    ///
    /// `None` when no metadata file exists (the package is simply not
    /// installed there).
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or
    /// parsed.
    pub fn read_from(install_dir: &Path) -> Result<Option<Self>, MetadataError> {
        let path = Self::path_in(install_dir);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).map_err(|e| MetadataError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let metadata = serde_json::from_str(&contents).map_err(|e| MetadataError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Some(metadata))
    }

    /// Write the metadata into an install directory.
    pub fn write_to(&self, install_dir: &Path) -> Result<(), MetadataError> {
        let path = Self::path_in(install_dir);
        let contents = serde_json::to_string_pretty(self).map_err(|e| MetadataError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        fs::write(&path, contents).map_err(|e| MetadataError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let metadata = InstallMetadata {
            version: "1.4.2".to_string(),
            install_path: temp.path().to_path_buf(),
            installed_at: Utc::now(),
            updated_at: Utc::now(),
        };

        metadata.write_to(temp.path()).unwrap();
        let loaded = InstallMetadata::read_from(temp.path()).unwrap().unwrap();

        assert_eq!(loaded.version, "1.4.2");
        assert_eq!(loaded.install_path, temp.path());
    }

    #[test]
    fn test_read_absent_metadata() {
        let temp = TempDir::new().unwrap();
        assert!(InstallMetadata::read_from(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_read_malformed_metadata() {
        let temp = TempDir::new().unwrap();
        fs::write(InstallMetadata::path_in(temp.path()), "{not json").unwrap();

        let result = InstallMetadata::read_from(temp.path());
        assert!(matches!(result, Err(MetadataError::Parse { .. })));
    }
}

//! Package identity, versions, and lifecycle status.

mod manifest;
mod metadata;

pub use manifest::PackageManifest;
pub use metadata::{InstallMetadata, MetadataError, METADATA_FILE_NAME};

use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle status of a package on this machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    NotInstalled,
    Downloading,
    Installing,
    Installed,
    UpdateAvailable,
    Error,
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackageStatus::NotInstalled => "not installed",
            PackageStatus::Downloading => "downloading",
            PackageStatus::Installing => "installing",
            PackageStatus::Installed => "installed",
            PackageStatus::UpdateAvailable => "update available",
            PackageStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// A versioned content package, as seen by the orchestrator.
///
/// `latest_version`, `download_url`, `checksum` and `total_size` come
/// from the remote manifest; `current_version` and `install_path` come
/// from local install metadata when the package is installed.
///
/// Invariant: `install_path` is `Some` exactly when the status is
/// `Installed` or `UpdateAvailable`.
#[derive(Debug, Clone)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub current_version: Option<String>,
    pub latest_version: String,
    pub download_url: String,
    pub checksum: Option<String>,
    pub total_size: u64,
    pub status: PackageStatus,
    pub install_path: Option<PathBuf>,
}

impl Package {
    /// Build a package from its remote manifest.
    pub fn from_manifest(
        id: impl Into<String>,
        name: impl Into<String>,
        manifest: &PackageManifest,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            current_version: None,
            latest_version: manifest.version.clone(),
            download_url: manifest.download_url.clone(),
            checksum: manifest.checksum().map(str::to_string),
            total_size: manifest.size,
            status: PackageStatus::NotInstalled,
            install_path: None,
        }
    }

    /// Merge in local install state, if any.
    ///
    /// Reads the install metadata under `install_dir` and, when present,
    /// marks the package installed at that version.
    ///
    /// # Errors
    ///
    /// Returns an error only when metadata exists but cannot be read or
    /// parsed; an absent metadata file leaves the package untouched.
    pub fn load_installed(&mut self, install_dir: &Path) -> Result<(), MetadataError> {
        if let Some(metadata) = InstallMetadata::read_from(install_dir)? {
            // Versions are compared as opaque strings, not parsed
            self.status = if metadata.version == self.latest_version {
                PackageStatus::Installed
            } else {
                PackageStatus::UpdateAvailable
            };
            self.current_version = Some(metadata.version);
            self.install_path = Some(metadata.install_path);
        }
        Ok(())
    }

    pub fn is_installed(&self) -> bool {
        matches!(
            self.status,
            PackageStatus::Installed | PackageStatus::UpdateAvailable
        )
    }

    pub fn update_available(&self) -> bool {
        self.status == PackageStatus::UpdateAvailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn manifest(version: &str) -> PackageManifest {
        PackageManifest {
            version: version.to_string(),
            download_url: "https://example.com/pkg.zip".to_string(),
            size: 1234,
            sha256: "abc123".to_string(),
        }
    }

    #[test]
    fn test_from_manifest() {
        let pkg = Package::from_manifest("base-pack", "Base Pack", &manifest("1.2.0"));

        assert_eq!(pkg.id, "base-pack");
        assert_eq!(pkg.latest_version, "1.2.0");
        assert_eq!(pkg.checksum.as_deref(), Some("abc123"));
        assert_eq!(pkg.total_size, 1234);
        assert_eq!(pkg.status, PackageStatus::NotInstalled);
        assert!(!pkg.update_available());
    }

    #[test]
    fn test_load_installed_absent_metadata() {
        let temp = TempDir::new().unwrap();
        let mut pkg = Package::from_manifest("base-pack", "Base Pack", &manifest("1.2.0"));

        pkg.load_installed(temp.path()).unwrap();

        assert_eq!(pkg.status, PackageStatus::NotInstalled);
        assert!(pkg.current_version.is_none());
    }

    #[test]
    fn test_update_available_after_loading_older_install() {
        let temp = TempDir::new().unwrap();
        let metadata = InstallMetadata {
            version: "1.1.0".to_string(),
            install_path: temp.path().to_path_buf(),
            installed_at: Utc::now(),
            updated_at: Utc::now(),
        };
        metadata.write_to(temp.path()).unwrap();

        let mut pkg = Package::from_manifest("base-pack", "Base Pack", &manifest("1.2.0"));
        pkg.load_installed(temp.path()).unwrap();

        assert_eq!(pkg.status, PackageStatus::UpdateAvailable);
        assert_eq!(pkg.current_version.as_deref(), Some("1.1.0"));
        assert!(pkg.is_installed());
        assert!(pkg.update_available());
        assert!(pkg.install_path.is_some());
    }

    #[test]
    fn test_no_update_when_versions_match() {
        let temp = TempDir::new().unwrap();
        let metadata = InstallMetadata {
            version: "1.2.0".to_string(),
            install_path: temp.path().to_path_buf(),
            installed_at: Utc::now(),
            updated_at: Utc::now(),
        };
        metadata.write_to(temp.path()).unwrap();

        let mut pkg = Package::from_manifest("base-pack", "Base Pack", &manifest("1.2.0"));
        pkg.load_installed(temp.path()).unwrap();

        assert!(pkg.is_installed());
        assert!(!pkg.update_available());
    }
}

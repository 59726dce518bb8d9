//! Packhaul - versioned content package acquisition
//!
//! This library downloads, verifies, and installs versioned content
//! packages: a concurrency-limited download engine with checksum and
//! size verification, a zip-slip-safe archive extractor, and an
//! orchestrator that makes updates atomic at the package level through
//! backup-then-restore.

pub mod checksum;
pub mod config;
pub mod download;
pub mod extract;
pub mod installer;
pub mod package;

pub use config::InstallerConfig;
pub use download::{DownloadEngine, DownloadError, DownloadRequest, DownloadTask};
pub use extract::{extract_archive, ExtractError};
pub use installer::{
    InstallError, InstallProgressCallback, InstallStage, InstallationProgress, PackageInstaller,
};
pub use package::{InstallMetadata, Package, PackageManifest, PackageStatus};

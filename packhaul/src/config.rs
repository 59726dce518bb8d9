//! Installer configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default cap on simultaneous downloads.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 3;

/// Default number of per-package backups retained across updates.
pub const DEFAULT_KEEP_BACKUPS: usize = 3;

/// Configuration for the installation orchestrator.
///
/// Built with [`InstallerConfig::new`] plus `with_*` setters:
///
/// ```
/// use packhaul::config::InstallerConfig;
///
/// let config = InstallerConfig::new("/opt/packs", "/opt/packs/.staging")
///     .with_max_concurrent_downloads(2);
/// ```
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Root under which each package installs into `<root>/<package id>`.
    pub install_root: PathBuf,
    /// Where archives are staged during download, one subdirectory per
    /// task id.
    pub staging_dir: PathBuf,
    /// Where update backups live, one subdirectory per backup.
    pub backup_dir: PathBuf,
    pub max_concurrent_downloads: usize,
    /// Whole-request HTTP timeout; `None` (the default) disables it.
    pub download_timeout: Option<Duration>,
    /// How many backups to retain per package.
    pub keep_backups: usize,
}

impl InstallerConfig {
    pub fn new(install_root: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        let install_root = install_root.into();
        let backup_dir = install_root.join(".backups");
        Self {
            install_root,
            staging_dir: staging_dir.into(),
            backup_dir,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            download_timeout: None,
            keep_backups: DEFAULT_KEEP_BACKUPS,
        }
    }

    pub fn with_backup_dir(mut self, backup_dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = backup_dir.into();
        self
    }

    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn with_keep_backups(mut self, keep: usize) -> Self {
        self.keep_backups = keep;
        self
    }

    /// The install directory for a package id.
    pub fn install_dir(&self, package_id: &str) -> PathBuf {
        self.install_root.join(package_id)
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }
}

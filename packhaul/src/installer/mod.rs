//! The installation orchestrator.
//!
//! Drives the full lifecycle of a package: download the archive into
//! staging, verify it, extract into the install directory, and write
//! install metadata. Updates wrap the same stages in backup-then-restore
//! so a failed update ends with the previous version intact whenever
//! the restore itself succeeds.
//!
//! Operations on the same package are serialized through a per-package
//! guard; different packages proceed in parallel up to the download
//! concurrency limit.
//!
//! The orchestrator owns the package lifecycle status: operations take
//! `&mut Package` and move it through `Downloading` and `Installing`
//! to `Installed` (or `Error` on failure, `NotInstalled` after an
//! uninstall).

mod backup;
mod error;
mod progress;

pub use backup::Backup;
pub use error::InstallError;
pub use progress::{InstallProgressCallback, InstallStage, InstallationProgress};

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::InstallerConfig;
use crate::download::{DownloadEngine, DownloadRequest, STALE_DOWNLOAD_AGE};
use crate::extract::extract_archive;
use crate::package::{InstallMetadata, Package, PackageStatus};

/// Name of the staged archive inside a task's staging directory.
const ARCHIVE_FILE_NAME: &str = "package.zip";

/// How often a blocked install loop wakes to emit a download snapshot.
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Orchestrates installs, updates, and uninstalls of packages.
pub struct PackageInstaller {
    config: InstallerConfig,
    engine: DownloadEngine,
    guards: DashMap<String, Arc<Mutex<()>>>,
}

impl PackageInstaller {
    /// Create an installer and sweep staging of abandoned downloads.
    pub fn new(config: InstallerConfig) -> Self {
        let engine = DownloadEngine::new(
            config.staging_dir.clone(),
            config.max_concurrent_downloads,
            config.download_timeout,
        );
        engine.cleanup_stale_downloads(STALE_DOWNLOAD_AGE);
        Self {
            config,
            engine,
            guards: DashMap::new(),
        }
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// The underlying download engine, for task status and cancellation.
    pub fn engine(&self) -> &DownloadEngine {
        &self.engine
    }

    /// Install metadata for a package, or `None` when not installed.
    pub fn installed_metadata(
        &self,
        package_id: &str,
    ) -> Result<Option<InstallMetadata>, InstallError> {
        let install_dir = self.config.install_dir(package_id);
        Ok(InstallMetadata::read_from(&install_dir)?)
    }

    /// Install (or reinstall) a package at its manifest version.
    ///
    /// Stages: download into staging, extract into the install
    /// directory, write metadata. The package's status tracks the
    /// stages (`Downloading`, `Installing`) and ends at `Installed`;
    /// on failure it is set to `Error` and whatever was written so far
    /// stays in place. Reinstalling overwrites it.
    ///
    /// # Errors
    ///
    /// Propagates download, extraction, and metadata errors; a
    /// cancelled download surfaces as
    /// [`DownloadError::Cancelled`](crate::download::DownloadError::Cancelled).
    pub fn install(
        &self,
        package: &mut Package,
        on_progress: Option<&InstallProgressCallback>,
    ) -> Result<InstallMetadata, InstallError> {
        let guard = self.guard(&package.id);
        let _lock = guard.lock();

        let install_dir = self.config.install_dir(&package.id);
        let prior_installed_at =
            InstallMetadata::read_from(&install_dir)?.map(|m| m.installed_at);

        let result = self.run_stages(package, &install_dir, prior_installed_at, on_progress);
        if result.is_err() {
            package.status = PackageStatus::Error;
            package.install_path = None;
        }
        result
    }

    /// Update an installed package to its manifest version.
    ///
    /// A full backup of the install directory is taken first; if it
    /// cannot be created the update aborts with the installation
    /// untouched. On success the backup is discarded. On failure the
    /// backup is restored, and the original error is wrapped in
    /// [`InstallError::UpdateFailedRestored`]. If the restore itself
    /// fails the backup is retained on disk and
    /// [`InstallError::UpdateFailedUnrecoverable`] is returned.
    ///
    /// A cancelled download happens before the install directory is
    /// touched, so it discards the backup and propagates as-is. After a
    /// successful restore (and after a cancellation) the package status
    /// reverts to `Installed`; only an unrecoverable restore failure
    /// leaves it at `Error`.
    pub fn update(
        &self,
        package: &mut Package,
        on_progress: Option<&InstallProgressCallback>,
    ) -> Result<InstallMetadata, InstallError> {
        let guard = self.guard(&package.id);
        let _lock = guard.lock();

        let install_dir = self.config.install_dir(&package.id);
        let prior = InstallMetadata::read_from(&install_dir)?.ok_or_else(|| {
            InstallError::NotInstalled {
                id: package.id.clone(),
            }
        })?;

        info!(
            "updating {} from {} to {}",
            package.id, prior.version, package.latest_version
        );

        Backup::prune_old(&self.config.backup_dir, &package.id, self.config.keep_backups);

        let backup = Backup::create(&self.config.backup_dir, &package.id, &install_dir)
            .map_err(|e| InstallError::Backup {
                id: package.id.clone(),
                reason: e.to_string(),
            })?;

        match self.run_stages(package, &install_dir, Some(prior.installed_at), on_progress) {
            Ok(metadata) => {
                backup.discard();
                Ok(metadata)
            }
            Err(err) if err.is_cancelled() => {
                // Cancellation happens during the download stage, before
                // the install directory is touched. Nothing to restore.
                backup.discard();
                package.status = PackageStatus::Installed;
                package.install_path = Some(install_dir);
                Err(err)
            }
            Err(err) => match backup.restore() {
                Ok(()) => {
                    backup.discard();
                    package.status = PackageStatus::Installed;
                    package.install_path = Some(install_dir);
                    Err(InstallError::UpdateFailedRestored {
                        id: package.id.clone(),
                        source: Box::new(err),
                    })
                }
                Err(restore_err) => {
                    warn!(
                        "restore of {} failed, backup retained at {}",
                        package.id,
                        backup.path().display()
                    );
                    package.status = PackageStatus::Error;
                    package.install_path = None;
                    Err(InstallError::UpdateFailedUnrecoverable {
                        id: package.id.clone(),
                        update_error: Box::new(err),
                        restore_reason: restore_err.to_string(),
                    })
                }
            },
        }
    }

    /// Uninstall a package: remove its install directory and reset the
    /// package to `NotInstalled`. Idempotent: uninstalling a package
    /// that is not installed succeeds.
    pub fn uninstall(&self, package: &mut Package) -> Result<(), InstallError> {
        self.remove_package_dir(&package.id)?;
        package.status = PackageStatus::NotInstalled;
        package.current_version = None;
        package.install_path = None;
        Ok(())
    }

    /// Remove a package's install directory by id, for callers that
    /// hold no [`Package`]. Idempotent.
    pub fn remove_package_dir(&self, package_id: &str) -> Result<(), InstallError> {
        let guard = self.guard(package_id);
        let _lock = guard.lock();

        let install_dir = self.config.install_dir(package_id);
        if install_dir.exists() {
            fs::remove_dir_all(&install_dir).map_err(|e| InstallError::Io {
                path: install_dir.clone(),
                source: e,
            })?;
            info!("uninstalled {}", package_id);
        } else {
            debug!("uninstall of {}: nothing installed", package_id);
        }
        Ok(())
    }

    fn guard(&self, package_id: &str) -> Arc<Mutex<()>> {
        self.guards
            .entry(package_id.to_string())
            .or_default()
            .clone()
    }

    /// Download, extract, finalize. Shared by install and update.
    ///
    /// Moves the package through `Downloading` and `Installing`, and to
    /// `Installed` (with version and install path filled in) once the
    /// metadata is written. Callers own the terminal status on failure.
    fn run_stages(
        &self,
        package: &mut Package,
        install_dir: &Path,
        installed_at: Option<DateTime<Utc>>,
        on_progress: Option<&InstallProgressCallback>,
    ) -> Result<InstallMetadata, InstallError> {
        let id = &package.id;
        package.status = PackageStatus::Downloading;
        emit(
            on_progress,
            &InstallationProgress::stage_start(id, InstallStage::Downloading),
        );

        fs::create_dir_all(install_dir).map_err(|e| InstallError::Io {
            path: install_dir.to_path_buf(),
            source: e,
        })?;

        let staging = self.engine.staging_path_for(&package.download_url);
        let archive = staging.join(ARCHIVE_FILE_NAME);

        let task = self
            .engine
            .fetch(DownloadRequest {
                url: package.download_url.clone(),
                dest: archive.clone(),
                expected_size: package.total_size,
                expected_checksum: package.checksum.clone(),
            })
            .map_err(|err| fail(id, InstallStage::Downloading, err.into(), on_progress))?;

        loop {
            match task.wait_timeout(PROGRESS_POLL_INTERVAL) {
                Some(Ok(())) => break,
                Some(Err(err)) => {
                    return Err(fail(id, InstallStage::Downloading, err.into(), on_progress))
                }
                None => {
                    if let Some(cb) = on_progress {
                        let mut snapshot =
                            InstallationProgress::stage_start(id, InstallStage::Downloading);
                        snapshot.progress =
                            InstallStage::Downloading.overall(task.progress());
                        snapshot.download_speed = task.speed_bytes_per_sec();
                        cb(&snapshot);
                    }
                }
            }
        }

        package.status = PackageStatus::Installing;
        emit(
            on_progress,
            &InstallationProgress::stage_start(id, InstallStage::Extracting),
        );

        let extracted = match on_progress {
            Some(cb) => {
                let relay = |completed: usize, total: usize, name: &str| {
                    cb(&InstallationProgress {
                        package_id: id.clone(),
                        stage: InstallStage::Extracting,
                        progress: InstallStage::Extracting
                            .overall(completed as f64 / total.max(1) as f64),
                        current_file: Some(name.to_string()),
                        completed_files: completed,
                        total_files: total,
                        download_speed: 0,
                        error: None,
                    });
                };
                extract_archive(&archive, install_dir, Some(&relay))
            }
            None => extract_archive(&archive, install_dir, None),
        };
        let extracted = extracted
            .map_err(|err| fail(id, InstallStage::Extracting, err.into(), on_progress))?;

        emit(
            on_progress,
            &InstallationProgress::stage_start(id, InstallStage::Finalizing),
        );

        let now = Utc::now();
        let metadata = InstallMetadata {
            version: package.latest_version.clone(),
            install_path: install_dir.to_path_buf(),
            installed_at: installed_at.unwrap_or(now),
            updated_at: now,
        };
        metadata
            .write_to(install_dir)
            .map_err(|err| fail(id, InstallStage::Finalizing, err.into(), on_progress))?;

        package.status = PackageStatus::Installed;
        package.current_version = Some(metadata.version.clone());
        package.install_path = Some(install_dir.to_path_buf());

        // Staged archive is no longer needed; losing it only costs disk
        if let Err(err) = fs::remove_dir_all(&staging) {
            warn!("failed to clean staging {}: {}", staging.display(), err);
        }

        let mut done = InstallationProgress::stage_start(id, InstallStage::Finalizing);
        done.progress = 1.0;
        emit(on_progress, &done);

        info!(
            "installed {} {} ({} files) into {}",
            id,
            metadata.version,
            extracted,
            install_dir.display()
        );
        Ok(metadata)
    }
}

fn emit(on_progress: Option<&InstallProgressCallback>, snapshot: &InstallationProgress) {
    if let Some(cb) = on_progress {
        cb(snapshot);
    }
}

/// Log a stage failure and report it through the progress callback
/// before it propagates.
fn fail(
    package_id: &str,
    stage: InstallStage,
    err: InstallError,
    on_progress: Option<&InstallProgressCallback>,
) -> InstallError {
    warn!("{} of {} failed: {}", stage.name(), package_id, err);
    if let Some(cb) = on_progress {
        let mut snapshot = InstallationProgress::stage_start(package_id, stage);
        snapshot.error = Some(err.to_string());
        cb(&snapshot);
    }
    err
}

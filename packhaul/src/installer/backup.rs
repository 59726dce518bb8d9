//! Pre-update backups of install directories.
//!
//! A backup is a full copy of the install directory, taken before an
//! update touches anything. Backup names embed a sortable timestamp so
//! lexicographic order is chronological order, which is what pruning
//! relies on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

/// Timestamp format embedded in backup directory names. Sorts
/// lexicographically in chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

fn backup_prefix(package_id: &str) -> String {
    format!("{package_id}-backup-")
}

/// A completed backup of one package's install directory.
pub struct Backup {
    package_id: String,
    path: PathBuf,
    install_dir: PathBuf,
}

impl Backup {
    /// Copy `install_dir` into a fresh timestamped directory under
    /// `backup_dir`.
    pub fn create(
        backup_dir: &Path,
        package_id: &str,
        install_dir: &Path,
    ) -> Result<Self, io::Error> {
        let timestamp = Utc::now().format(TIMESTAMP_FORMAT);
        let base_name = format!("{}{}", backup_prefix(package_id), timestamp);

        fs::create_dir_all(backup_dir)?;

        // Two updates inside the same second would collide on the name
        let mut path = backup_dir.join(&base_name);
        let mut attempt = 1;
        while path.exists() {
            attempt += 1;
            path = backup_dir.join(format!("{base_name}-{attempt}"));
        }

        copy_dir_recursive(install_dir, &path)?;
        info!(
            "created backup of {} at {}",
            install_dir.display(),
            path.display()
        );

        Ok(Self {
            package_id: package_id.to_string(),
            path,
            install_dir: install_dir.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Put the install directory back exactly as it was at backup time.
    ///
    /// Removes whatever the failed update left behind, then copies the
    /// backup back in full (metadata file included).
    pub fn restore(&self) -> Result<(), io::Error> {
        if self.install_dir.exists() {
            fs::remove_dir_all(&self.install_dir)?;
        }
        copy_dir_recursive(&self.path, &self.install_dir)?;
        info!(
            "restored {} from backup {}",
            self.install_dir.display(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the backup. Failure only costs disk space, so it is
    /// logged and swallowed.
    pub fn discard(self) {
        if let Err(err) = fs::remove_dir_all(&self.path) {
            warn!(
                "failed to remove backup {} for {}: {}",
                self.path.display(),
                self.package_id,
                err
            );
        }
    }

    /// Remove a package's oldest backups, keeping the `keep` most
    /// recent.
    ///
    /// # Returns
    ///
    /// The number of backups removed.
    pub fn prune_old(backup_dir: &Path, package_id: &str, keep: usize) -> usize {
        let entries = match fs::read_dir(backup_dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let prefix = backup_prefix(package_id);
        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix))
            .collect();

        if names.len() <= keep {
            return 0;
        }

        // Newest names first; timestamps make the sort chronological
        names.sort_by(|a, b| b.cmp(a));

        let mut removed = 0;
        for name in &names[keep..] {
            let path = backup_dir.join(name);
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    info!("removed old backup {}", path.display());
                    removed += 1;
                }
                Err(err) => {
                    warn!("failed to remove old backup {}: {}", path.display(), err);
                }
            }
        }
        removed
    }
}

/// Copy a directory tree, creating destination directories as needed.
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), io::Error> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(dir: &Path) {
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::write(dir.join("data/a.txt"), b"version one").unwrap();
        fs::write(dir.join("top.cfg"), b"k=v").unwrap();
    }

    #[test]
    fn test_create_copies_tree() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("pkg");
        let backups = temp.path().join("backups");
        populate(&install);

        let backup = Backup::create(&backups, "pkg", &install).unwrap();

        assert!(backup.path().starts_with(&backups));
        assert_eq!(
            fs::read_to_string(backup.path().join("data/a.txt")).unwrap(),
            "version one"
        );
        assert_eq!(
            fs::read_to_string(backup.path().join("top.cfg")).unwrap(),
            "k=v"
        );
        // Original untouched
        assert!(install.join("data/a.txt").exists());
    }

    #[test]
    fn test_restore_reverts_changes() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("pkg");
        let backups = temp.path().join("backups");
        populate(&install);

        let backup = Backup::create(&backups, "pkg", &install).unwrap();

        // Simulate a half-applied update
        fs::write(install.join("data/a.txt"), b"version two, truncated").unwrap();
        fs::write(install.join("garbage.tmp"), b"partial").unwrap();
        fs::remove_file(install.join("top.cfg")).unwrap();

        backup.restore().unwrap();

        assert_eq!(
            fs::read_to_string(install.join("data/a.txt")).unwrap(),
            "version one"
        );
        assert_eq!(fs::read_to_string(install.join("top.cfg")).unwrap(), "k=v");
        assert!(!install.join("garbage.tmp").exists());
    }

    #[test]
    fn test_discard_removes_backup() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("pkg");
        let backups = temp.path().join("backups");
        populate(&install);

        let backup = Backup::create(&backups, "pkg", &install).unwrap();
        let path = backup.path().to_path_buf();

        backup.discard();
        assert!(!path.exists());
    }

    #[test]
    fn test_prune_keeps_most_recent() {
        let temp = TempDir::new().unwrap();
        let backups = temp.path().join("backups");

        for timestamp in [
            "2026-08-01-10-00-00",
            "2026-08-02-10-00-00",
            "2026-08-03-10-00-00",
            "2026-08-04-10-00-00",
            "2026-08-05-10-00-00",
        ] {
            fs::create_dir_all(backups.join(format!("pkg-backup-{timestamp}"))).unwrap();
        }
        // Another package's backups are out of scope
        fs::create_dir_all(backups.join("other-backup-2026-01-01-00-00-00")).unwrap();

        let removed = Backup::prune_old(&backups, "pkg", 3);

        assert_eq!(removed, 2);
        assert!(!backups.join("pkg-backup-2026-08-01-10-00-00").exists());
        assert!(!backups.join("pkg-backup-2026-08-02-10-00-00").exists());
        assert!(backups.join("pkg-backup-2026-08-03-10-00-00").exists());
        assert!(backups.join("pkg-backup-2026-08-05-10-00-00").exists());
        assert!(backups.join("other-backup-2026-01-01-00-00-00").exists());
    }

    #[test]
    fn test_prune_under_limit_is_noop() {
        let temp = TempDir::new().unwrap();
        let backups = temp.path().join("backups");
        fs::create_dir_all(backups.join("pkg-backup-2026-08-01-10-00-00")).unwrap();

        assert_eq!(Backup::prune_old(&backups, "pkg", 3), 0);
        assert!(backups.join("pkg-backup-2026-08-01-10-00-00").exists());
    }

    #[test]
    fn test_prune_missing_backup_dir() {
        let temp = TempDir::new().unwrap();
        assert_eq!(Backup::prune_old(&temp.path().join("none"), "pkg", 3), 0);
    }
}

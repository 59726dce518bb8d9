//! Safe ZIP extraction for package archives.
//!
//! Entries are streamed to disk one at a time with per-file progress
//! reporting. The extractor defends against "zip-slip" path traversal:
//! any entry whose resolved path would land outside the destination
//! directory aborts the whole extraction. Symlink entries are rejected
//! rather than silently skipped, as are unsupported compression methods
//! (surfaced as [`ExtractError::Zip`]).
//!
//! Extraction is deliberately not transactional across the archive: a
//! failure partway through leaves a partially populated destination.
//! Rollback at the package level is the installer's responsibility.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Unix file-type mask and the symlink type bits within it.
const UNIX_FILE_TYPE_MASK: u32 = 0o170000;
const UNIX_SYMLINK_TYPE: u32 = 0o120000;

/// Errors from archive extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// An entry's resolved path escapes the destination directory.
    ///
    /// Security-relevant: never downgraded to a warning.
    #[error("archive entry escapes destination directory: {entry}")]
    PathTraversal { entry: String },

    /// An entry uses a feature the extractor refuses to materialize.
    #[error("unsupported archive entry {entry}: {reason}")]
    UnsupportedEntry { entry: String, reason: String },

    /// The archive itself is malformed or uses an unsupported method.
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    /// Filesystem I/O failed.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Extract a ZIP archive into a destination directory.
///
/// Directory entries create directories; file entries create their parent
/// directories and stream bytes to disk, preserving unix mode bits where
/// the platform honors them. After each file entry completes,
/// `on_progress(completed, total_files, entry_name)` is invoked.
///
/// # Returns
///
/// The number of file entries extracted.
///
/// # Errors
///
/// Returns [`ExtractError::PathTraversal`] for any entry resolving
/// outside `dest_dir`, [`ExtractError::UnsupportedEntry`] for symlink
/// entries, and I/O or archive errors otherwise. On a mid-entry failure
/// the partially written file for that entry is removed; earlier entries
/// are left in place.
pub fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    on_progress: Option<&dyn Fn(usize, usize, &str)>,
) -> Result<usize, ExtractError> {
    let file = File::open(archive_path).map_err(|e| ExtractError::Io {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut archive = zip::ZipArchive::new(file)?;

    fs::create_dir_all(dest_dir).map_err(|e| ExtractError::Io {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    let total_files = archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .count();

    let mut completed = 0usize;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let entry_name = entry.name().to_string();

        // Zip-slip defence: refuse entries whose normalized path leaves
        // the destination (absolute names, `..` components).
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ExtractError::PathTraversal {
                entry: entry_name.clone(),
            })?;
        let out_path = dest_dir.join(relative);

        if let Some(mode) = entry.unix_mode() {
            if mode & UNIX_FILE_TYPE_MASK == UNIX_SYMLINK_TYPE {
                return Err(ExtractError::UnsupportedEntry {
                    entry: entry_name,
                    reason: "symlink entries are not extracted".to_string(),
                });
            }
        }

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| ExtractError::Io {
                path: out_path.clone(),
                source: e,
            })?;
            set_unix_mode(&out_path, entry.unix_mode());
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExtractError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut out = File::create(&out_path).map_err(|e| ExtractError::Io {
            path: out_path.clone(),
            source: e,
        })?;

        if let Err(e) = io::copy(&mut entry, &mut out) {
            // Remove the half-written file before surfacing the error.
            drop(out);
            fs::remove_file(&out_path).ok();
            return Err(ExtractError::Io {
                path: out_path,
                source: e,
            });
        }

        set_unix_mode(&out_path, entry.unix_mode());

        completed += 1;
        if let Some(cb) = on_progress {
            cb(completed, total_files, &entry_name);
        }
    }

    debug!(
        "extracted {} files from {} into {}",
        completed,
        archive_path.display(),
        dest_dir.display()
    );

    Ok(completed)
}

/// Apply the archive's declared permission bits where the OS honors them.
#[cfg(unix)]
fn set_unix_mode(path: &Path, mode: Option<u32>) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        let permissions = mode & 0o777;
        if permissions != 0 {
            fs::set_permissions(path, fs::Permissions::from_mode(permissions)).ok();
        }
    }
}

#[cfg(not(unix))]
fn set_unix_mode(_path: &Path, _mode: Option<u32>) {}

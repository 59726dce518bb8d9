//! Error types for the installation orchestrator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadError;
use crate::extract::ExtractError;
use crate::package::MetadataError;

/// Errors from install, update, or uninstall operations.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The operation requires an existing installation.
    #[error("package {id} is not installed")]
    NotInstalled { id: String },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Creating the pre-update backup failed; the update was aborted
    /// and the installed version was not touched.
    #[error("backup for {id} failed: {reason}")]
    Backup { id: String, reason: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The update failed but the previous version was restored from
    /// backup. The install is back in its pre-update state.
    #[error("update of {id} failed, previous version restored: {source}")]
    UpdateFailedRestored {
        id: String,
        source: Box<InstallError>,
    },

    /// The update failed and the restore failed too. The backup is
    /// retained on disk for manual recovery.
    #[error(
        "update of {id} failed and restore also failed ({restore_reason}); \
         backup retained: {update_error}"
    )]
    UpdateFailedUnrecoverable {
        id: String,
        update_error: Box<InstallError>,
        restore_reason: String,
    },
}

impl InstallError {
    /// Whether this error is a cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallError::Download(DownloadError::Cancelled { .. }))
    }
}

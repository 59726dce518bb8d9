//! Error types for the download engine.

use thiserror::Error;

use crate::checksum::ChecksumError;

/// Errors from starting, running, or controlling a download.
///
/// `Clone` so a worker's terminal error can be stored on the task and
/// handed to every thread waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    /// A task for the same URL is already in the active registry.
    #[error("download already in progress for {url}")]
    AlreadyInProgress { url: String },

    /// No active task with this id exists.
    #[error("no active download with id {id}")]
    TaskNotFound { id: String },

    /// The HTTP request failed before or during the transfer.
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// The server answered with a non-success status code.
    #[error("server returned status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// The downloaded byte count differs from the declared size.
    #[error("size mismatch for {path}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Post-download checksum verification failed.
    #[error(transparent)]
    Checksum(#[from] ChecksumError),

    /// The download was cancelled before it could complete.
    #[error("download cancelled: {url}")]
    Cancelled { url: String },

    /// Filesystem I/O failed.
    #[error("failed to write {path}: {reason}")]
    Io { path: String, reason: String },
}

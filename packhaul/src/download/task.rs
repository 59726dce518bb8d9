//! A single tracked download and its shared progress state.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use sha2::{Digest, Sha256};

use super::error::DownloadError;

/// Derive the stable task id for a URL.
///
/// The id is the first 16 hex characters of the SHA-256 of the URL, so
/// the same URL always maps to the same task and staging directory.
pub fn task_id(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..16].to_string()
}

struct TaskState {
    finished: bool,
    error: Option<DownloadError>,
}

/// Shared handle to an in-flight (or finished) download.
///
/// The worker thread updates the atomic counters as bytes arrive;
/// any number of observer threads may read them without locking.
/// Termination is signalled through a mutex/condvar pair so waiters
/// can block in [`DownloadTask::wait`].
pub struct DownloadTask {
    id: String,
    url: String,
    dest: PathBuf,
    expected_checksum: Option<String>,
    expected_size: AtomicU64,
    bytes_downloaded: AtomicU64,
    speed: AtomicU64,
    started_at: Instant,
    cancelled: AtomicBool,
    completed: AtomicBool,
    state: Mutex<TaskState>,
    finished_cond: Condvar,
}

impl DownloadTask {
    pub fn new(
        url: impl Into<String>,
        dest: impl Into<PathBuf>,
        expected_size: u64,
        expected_checksum: Option<String>,
    ) -> Self {
        let url = url.into();
        Self {
            id: task_id(&url),
            url,
            dest: dest.into(),
            expected_checksum,
            expected_size: AtomicU64::new(expected_size),
            bytes_downloaded: AtomicU64::new(0),
            speed: AtomicU64::new(0),
            started_at: Instant::now(),
            cancelled: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            state: Mutex::new(TaskState {
                finished: false,
                error: None,
            }),
            finished_cond: Condvar::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn expected_checksum(&self) -> Option<&str> {
        self.expected_checksum.as_deref()
    }

    pub fn expected_size(&self) -> u64 {
        self.expected_size.load(Ordering::Relaxed)
    }

    /// Fill in the size from the Content-Length header when the caller
    /// did not declare one.
    pub fn set_expected_size(&self, size: u64) {
        self.expected_size.store(size, Ordering::Relaxed);
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::Relaxed)
    }

    pub fn record_progress(&self, total_bytes: u64) {
        self.bytes_downloaded.store(total_bytes, Ordering::Relaxed);
    }

    /// Most recent sampled transfer speed in bytes per second.
    pub fn speed_bytes_per_sec(&self) -> u64 {
        self.speed.load(Ordering::Relaxed)
    }

    pub fn set_speed(&self, bytes_per_sec: u64) {
        self.speed.store(bytes_per_sec, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Fraction of the download completed, in `0.0..=1.0`.
    ///
    /// A finished task always reports `1.0`. While the size is unknown
    /// (no declared size and no Content-Length yet) this reports `0.0`.
    pub fn progress(&self) -> f64 {
        if self.completed.load(Ordering::Relaxed) {
            return 1.0;
        }
        let expected = self.expected_size();
        if expected == 0 {
            return 0.0;
        }
        (self.bytes_downloaded() as f64 / expected as f64).min(1.0)
    }

    /// Request cancellation. The worker observes the flag at the next
    /// chunk boundary; this never blocks.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Relaxed)
    }

    /// Record the terminal result and wake all waiters. Called exactly
    /// once, by the worker, after the task left the active registry.
    pub fn finish(&self, result: Result<(), DownloadError>) {
        if result.is_ok() {
            self.completed.store(true, Ordering::Relaxed);
        }
        let mut state = self.state.lock();
        state.finished = true;
        state.error = result.err();
        self.finished_cond.notify_all();
    }

    /// Block until the task terminates, returning its result.
    pub fn wait(&self) -> Result<(), DownloadError> {
        let mut state = self.state.lock();
        while !state.finished {
            self.finished_cond.wait(&mut state);
        }
        match &state.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Block until the task terminates or the timeout elapses.
    ///
    /// Returns `None` on timeout, `Some(result)` on termination.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<(), DownloadError>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.finished {
            if self
                .finished_cond
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                if state.finished {
                    break;
                }
                return None;
            }
        }
        Some(match &state.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        })
    }
}

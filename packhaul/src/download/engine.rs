//! The download engine: task registry, worker threads, verification.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::checksum;

use super::error::DownloadError;
use super::slots::WorkerSlots;
use super::task::{task_id, DownloadTask};

/// Transfer chunk size (64KB). Cancellation is observed at chunk
/// granularity, so this also bounds cancel latency per task.
const CHUNK_SIZE: usize = 64 * 1024;

/// Minimum interval between transfer-speed samples.
const SPEED_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Staging directories untouched for this long are considered abandoned.
pub const STALE_DOWNLOAD_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Everything needed to start one download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub dest: PathBuf,
    /// Declared size in bytes; `0` means unknown, in which case the
    /// Content-Length header fills it in when present.
    pub expected_size: u64,
    /// Expected SHA-256 hex digest, verified after the transfer.
    pub expected_checksum: Option<String>,
}

struct EngineInner {
    client: reqwest::blocking::Client,
    staging_dir: PathBuf,
    slots: Arc<WorkerSlots>,
    tasks: RwLock<HashMap<String, Arc<DownloadTask>>>,
}

/// Concurrency-limited downloader with an active-task registry.
///
/// Cheap to clone; all clones share the same registry and slot pool.
#[derive(Clone)]
pub struct DownloadEngine {
    inner: Arc<EngineInner>,
}

impl DownloadEngine {
    /// Create an engine.
    ///
    /// `staging_dir` is where package-manager callers stage archives and
    /// is only consulted here for stale-directory cleanup. `timeout` is
    /// the whole-request timeout; `None` disables it so large transfers
    /// on slow links are never cut off.
    pub fn new(
        staging_dir: impl Into<PathBuf>,
        max_concurrent: usize,
        timeout: Option<Duration>,
    ) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        let staging_dir = staging_dir.into();
        if let Err(err) = fs::create_dir_all(&staging_dir) {
            warn!(
                "failed to create staging directory {}: {}",
                staging_dir.display(),
                err
            );
        }

        Self {
            inner: Arc::new(EngineInner {
                client,
                staging_dir,
                slots: WorkerSlots::new(max_concurrent),
                tasks: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.inner.staging_dir
    }

    /// Start a download and return its task handle.
    ///
    /// The task is registered before the worker thread spawns, so a
    /// second `fetch` for the same URL fails with `AlreadyInProgress`
    /// until the first terminates. The worker waits for a free slot,
    /// streams the body in chunks, then verifies size and checksum.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::AlreadyInProgress`] if a task for this
    /// URL is already active. Transfer errors surface through
    /// [`DownloadTask::wait`] on the returned handle.
    pub fn fetch(&self, request: DownloadRequest) -> Result<Arc<DownloadTask>, DownloadError> {
        let task = Arc::new(DownloadTask::new(
            request.url,
            request.dest,
            request.expected_size,
            request.expected_checksum,
        ));
        let id = task.id().to_string();

        {
            let mut tasks = self.inner.tasks.write();
            if tasks.contains_key(&id) {
                return Err(DownloadError::AlreadyInProgress {
                    url: task.url().to_string(),
                });
            }
            tasks.insert(id.clone(), Arc::clone(&task));
        }

        debug!("queued download {} for {}", id, task.url());

        let inner = Arc::clone(&self.inner);
        let worker_task = Arc::clone(&task);
        thread::spawn(move || {
            let slot = inner.slots.acquire();

            let result = if worker_task.is_cancelled() {
                Err(DownloadError::Cancelled {
                    url: worker_task.url().to_string(),
                })
            } else {
                run_download(&inner.client, &worker_task)
            };

            drop(slot);

            // Leave the registry before waking waiters so a retry of the
            // same URL never races against a finished task.
            inner.tasks.write().remove(worker_task.id());

            match &result {
                Ok(()) => info!(
                    "download {} complete: {} bytes from {}",
                    worker_task.id(),
                    worker_task.bytes_downloaded(),
                    worker_task.url()
                ),
                Err(DownloadError::Cancelled { url }) => {
                    info!("download {} cancelled: {}", worker_task.id(), url)
                }
                Err(err) => warn!("download {} failed: {}", worker_task.id(), err),
            }

            worker_task.finish(result);
        });

        Ok(task)
    }

    /// Request cancellation of an active task.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::TaskNotFound`] if no task with this id
    /// is active (it may have already terminated).
    pub fn cancel(&self, id: &str) -> Result<(), DownloadError> {
        let tasks = self.inner.tasks.read();
        match tasks.get(id) {
            Some(task) => {
                task.cancel();
                Ok(())
            }
            None => Err(DownloadError::TaskNotFound { id: id.to_string() }),
        }
    }

    /// Look up an active task by id.
    pub fn status(&self, id: &str) -> Option<Arc<DownloadTask>> {
        self.inner.tasks.read().get(id).cloned()
    }

    /// Snapshot of all currently active tasks.
    pub fn active_tasks(&self) -> Vec<Arc<DownloadTask>> {
        self.inner.tasks.read().values().cloned().collect()
    }

    /// Convenience wrapper: the staging subdirectory for a URL's task.
    pub fn staging_path_for(&self, url: &str) -> PathBuf {
        self.inner.staging_dir.join(task_id(url))
    }

    /// Remove staging subdirectories older than `max_age`.
    ///
    /// These are leftovers from crashed or abandoned runs. Individual
    /// removal failures are logged and skipped.
    ///
    /// # Returns
    ///
    /// The number of directories removed.
    pub fn cleanup_stale_downloads(&self, max_age: Duration) -> usize {
        let entries = match fs::read_dir(&self.inner.staging_dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok());

            if let Some(age) = age {
                if age > max_age {
                    match fs::remove_dir_all(&path) {
                        Ok(()) => {
                            info!("removed stale staging directory {}", path.display());
                            removed += 1;
                        }
                        Err(err) => {
                            warn!(
                                "failed to remove stale staging directory {}: {}",
                                path.display(),
                                err
                            );
                        }
                    }
                }
            }
        }
        removed
    }
}

/// Transfer one task's body to disk and verify it.
fn run_download(
    client: &reqwest::blocking::Client,
    task: &DownloadTask,
) -> Result<(), DownloadError> {
    let url = task.url().to_string();

    let mut response = client
        .get(&url)
        .send()
        .map_err(|e| DownloadError::Http {
            url: url.clone(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            url,
            status: status.as_u16(),
        });
    }

    if task.expected_size() == 0 {
        if let Some(len) = response.content_length() {
            task.set_expected_size(len);
        }
    }

    let dest = task.dest().to_path_buf();
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| DownloadError::Io {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })?;
    }

    let mut out = File::create(&dest).map_err(|e| DownloadError::Io {
        path: dest.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut total: u64 = 0;
    let mut sample_started = Instant::now();
    let mut sample_bytes: u64 = 0;

    loop {
        // Cancellation keeps the partial file; a stale-cleanup pass
        // reclaims it later.
        if task.is_cancelled() {
            return Err(DownloadError::Cancelled { url });
        }

        let read = match response.read(&mut buffer) {
            Ok(read) => read,
            Err(e) => {
                drop(out);
                fs::remove_file(&dest).ok();
                return Err(DownloadError::Http {
                    url,
                    reason: e.to_string(),
                });
            }
        };
        if read == 0 {
            break;
        }

        if let Err(e) = out.write_all(&buffer[..read]) {
            drop(out);
            fs::remove_file(&dest).ok();
            return Err(DownloadError::Io {
                path: dest.display().to_string(),
                reason: e.to_string(),
            });
        }

        total += read as u64;
        sample_bytes += read as u64;
        task.record_progress(total);

        let elapsed = sample_started.elapsed();
        if elapsed >= SPEED_SAMPLE_INTERVAL {
            task.set_speed((sample_bytes as f64 / elapsed.as_secs_f64()) as u64);
            sample_started = Instant::now();
            sample_bytes = 0;
        }
    }

    out.flush().map_err(|e| DownloadError::Io {
        path: dest.display().to_string(),
        reason: e.to_string(),
    })?;
    drop(out);

    let expected = task.expected_size();
    if expected > 0 && total != expected {
        fs::remove_file(&dest).ok();
        return Err(DownloadError::SizeMismatch {
            path: dest.display().to_string(),
            expected,
            actual: total,
        });
    }

    if let Some(expected) = task.expected_checksum() {
        if let Err(err) = checksum::verify(&dest, expected) {
            fs::remove_file(&dest).ok();
            return Err(err.into());
        }
    }

    Ok(())
}

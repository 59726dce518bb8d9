//! Concurrency-limited download engine.
//!
//! Downloads run on worker threads gated by a fixed pool of slots.
//! Each download is tracked as a [`DownloadTask`] in an active-task
//! registry keyed by a stable task id derived from the URL, so callers
//! can observe progress, cancel, or block until termination. Completed
//! and failed tasks are removed from the registry before their waiters
//! are woken.

mod engine;
mod error;
mod slots;
mod task;

pub use engine::{DownloadEngine, DownloadRequest, STALE_DOWNLOAD_AGE};
pub use error::DownloadError;
pub use slots::{SlotGuard, WorkerSlots};
pub use task::{task_id, DownloadTask};

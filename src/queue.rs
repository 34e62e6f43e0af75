use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::info;

use crate::error::{AppError, Result};
use crate::model::{HistoryEntry, Job, JobId, JobStatus, QueuedJob};

/// Maximum number of entries kept in the history log
pub const HISTORY_CAPACITY: usize = 50;

/// Bounded, append-only record of recent jobs. The oldest entry is evicted
/// once the log grows past its capacity.
#[derive(Debug)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Returns false when the entry has already been evicted.
    pub fn set_status(&mut self, id: JobId, status: JobStatus) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

/// Unbounded FIFO of pending jobs plus the history log shown in the window.
///
/// Shared between the UI (enqueue, history snapshots) and the single worker
/// (dequeue, status updates).
#[derive(Debug, Default)]
pub struct JobQueue {
    pending: Mutex<VecDeque<QueuedJob>>,
    history: Mutex<HistoryLog>,
    available: Notify,
    next_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a job and files a `Queued` history entry for it.
    pub fn enqueue(&self, mut job: Job) -> Result<JobId> {
        job.url = job.url.trim().to_string();
        if job.url.is_empty() {
            return Err(AppError::EmptyUrl);
        }

        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        lock(&self.history).push(HistoryEntry::queued(id, &job));
        info!(%id, url = %job.url, format = %job.format, quality = %job.quality, "job queued");
        lock(&self.pending).push_back(QueuedJob { id, job });
        self.available.notify_one();
        Ok(id)
    }

    /// Waits until a job is available and removes the front one.
    pub async fn dequeue(&self) -> QueuedJob {
        loop {
            let next = lock(&self.pending).pop_front();
            if let Some(job) = next {
                return job;
            }
            self.available.notified().await;
        }
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.pending).is_empty()
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn set_status(&self, id: JobId, status: JobStatus) -> bool {
        lock(&self.history).set_status(id, status)
    }

    /// Copy of the history log, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        lock(&self.history).iter().cloned().collect()
    }

    pub fn status_of(&self, id: JobId) -> Option<JobStatus> {
        lock(&self.history)
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.status)
    }
}

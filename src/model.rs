use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::worker::WorkerEvent;

/// Format selectors offered in the format picker
pub const FORMAT_PRESETS: &[&str] = &[
    "bestvideo+bestaudio",
    "best",
    "worst",
    "bestvideo",
    "bestaudio",
    "mp4",
    "webm",
    "mp3",
    "m4a",
];

/// Quality selectors offered in the quality picker
pub const QUALITY_PRESETS: &[&str] = &["best", "worst", "720p", "1080p", "480p", "360p"];

pub const DEFAULT_FORMAT: &str = "bestvideo+bestaudio";
pub const AUDIO_FORMAT: &str = "bestaudio";
pub const DEFAULT_QUALITY: &str = "best";
pub const DEFAULT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// One user-submitted download request. Never mutated after it is enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Page or media URL handed to the downloader
    pub url: String,
    /// Format selector (preset or composite expression)
    pub format: String,
    /// `best`, `worst` or a height such as `720p`
    pub quality: String,
    /// Directory the downloader writes into
    pub output_dir: PathBuf,
    /// Fetch English subtitles alongside the media
    pub subtitles: bool,
    /// Treat the URL as a playlist
    pub playlist: bool,
    /// Restrict the download to an audio stream
    pub audio_only: bool,
    /// Output name template in the downloader's placeholder syntax
    pub filename_template: String,
}

/// Identifier handed out by the queue at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A job together with the id its history entry is filed under.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: JobId,
    pub job: Job,
}

/// Lifecycle of a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Waiting in the queue
    Queued,
    /// Picked up by the worker
    Downloading,
    /// Downloader exited with code 0
    Completed,
    /// Downloader could not start or exited non-zero
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Queued => "Queued",
            JobStatus::Downloading => "Downloading",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Display record of a job in the history list
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: JobId,
    pub url: String,
    pub format: String,
    pub quality: String,
    /// Fixed when the job is enqueued
    pub timestamp: DateTime<Local>,
    pub status: JobStatus,
}

impl HistoryEntry {
    pub fn queued(id: JobId, job: &Job) -> Self {
        Self {
            id,
            url: job.url.clone(),
            format: job.format.clone(),
            quality: job.quality.clone(),
            timestamp: Local::now(),
            status: JobStatus::Queued,
        }
    }

    pub fn timestamp_label(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// State behind the single progress bar and its status line
#[derive(Debug, Clone)]
pub struct LiveProgress {
    /// Job currently shown, if any
    pub current: Option<JobId>,
    /// Progress fraction (0.0 to 1.0)
    pub fraction: f32,
    /// Status line under the bar
    pub status: String,
    /// Secondary line: the URL being prepared, then speed and ETA
    pub detail: String,
}

impl Default for LiveProgress {
    fn default() -> Self {
        Self {
            current: None,
            fraction: 0.0,
            status: "Ready".to_string(),
            detail: String::new(),
        }
    }
}

impl LiveProgress {
    /// Folds one worker event into the displayed state.
    pub fn apply(&mut self, event: &WorkerEvent) {
        match event {
            WorkerEvent::Started { id, url } => {
                self.current = Some(*id);
                self.fraction = 0.0;
                self.status = "Preparing download...".to_string();
                self.detail = url.clone();
            }
            WorkerEvent::Progress { id, update } => {
                if self.current != Some(*id) {
                    return;
                }
                self.fraction = update.percent / 100.0;
                self.status = format!("Downloading... {:.1}%", update.percent);
                self.detail = match (&update.speed, &update.eta) {
                    (Some(speed), Some(eta)) => format!("{speed} - ETA {eta}"),
                    (Some(speed), None) => speed.clone(),
                    (None, Some(eta)) => format!("ETA {eta}"),
                    (None, None) => String::new(),
                };
            }
            WorkerEvent::Completed { .. } => {
                self.current = None;
                self.fraction = 1.0;
                self.status = "✅ Download complete".to_string();
                self.detail.clear();
            }
            WorkerEvent::Failed { .. } => {
                self.current = None;
                self.status = "❌ Download failed".to_string();
                self.detail.clear();
            }
        }
    }
}

use std::{ffi::OsStr, io, path::PathBuf, process::Stdio};

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::Command,
    sync::mpsc::UnboundedSender,
};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::model::{AUDIO_FORMAT, DEFAULT_FORMAT, Job, QueuedJob};
use crate::progress::parse_progress_update;
use crate::worker::WorkerEvent;

/// Containers that only ever carry audio
const AUDIO_CONTAINERS: &[&str] = &["mp3", "m4a", "aac", "opus", "ogg", "wav", "flac"];

/// How to launch the external downloader.
#[derive(Debug, Clone)]
pub struct Tool {
    /// Executable name or path
    pub program: PathBuf,
    /// Arguments placed before the generated ones on every call
    pub extra_args: Vec<String>,
}

impl Default for Tool {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl Tool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> String {
        self.program.display().to_string()
    }

    /// Fresh command with stdin detached and the extra arguments applied.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        // A download abandoned on a read error must not outlive its job.
        cmd.args(&self.extra_args)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// True for a single selector that picks an audio-only stream (`bestaudio`, `m4a`, ...).
pub fn is_audio_selector(selector: &str) -> bool {
    let selector = selector.trim().to_ascii_lowercase();
    selector.contains("audio") || AUDIO_CONTAINERS.contains(&selector.as_str())
}

/// True when every component of a composite expression is audio-only.
fn is_audio_expression(format: &str) -> bool {
    format.split(['/', '+']).all(is_audio_selector)
}

/// Format field contents after the audio-only checkbox flips.
///
/// Switching on keeps a typed audio expression (`m4a`, `bestaudio/mp3`) and
/// replaces anything else with `bestaudio`. Switching off restores the
/// default only when the field still holds an audio expression.
pub fn format_after_audio_toggle(format: &str, audio_only: bool) -> String {
    let format = format.trim();
    let is_audio = !format.is_empty() && is_audio_expression(format);
    if !format.is_empty() && is_audio == audio_only {
        format.to_string()
    } else if audio_only {
        AUDIO_FORMAT.to_string()
    } else {
        DEFAULT_FORMAT.to_string()
    }
}

/// Height in pixels requested by a quality such as `720p`; `None` for `best`/`worst`.
fn height_limit(quality: &str) -> Option<u32> {
    let quality = quality.trim();
    match quality {
        "" | "best" | "worst" => None,
        _ => {
            let digits = quality.trim_end_matches(['p', 'P']);
            match digits.parse::<u32>() {
                Ok(height) => Some(height),
                Err(_) => {
                    warn!(quality, "unrecognised quality, leaving format unconstrained");
                    None
                }
            }
        }
    }
}

/// Builds the `-f` expression for a format/quality pair.
///
/// The height constraint lands on every video component of the expression,
/// `bestvideo+bestaudio` at `720p` becomes `bestvideo[height<=720]+bestaudio`.
/// Audio-only jobs never carry a height.
pub fn format_expression(format: &str, quality: &str, audio_only: bool) -> String {
    let format = match format.trim() {
        "" => DEFAULT_FORMAT,
        f => f,
    };

    if audio_only {
        return if is_audio_expression(format) {
            format.to_string()
        } else {
            AUDIO_FORMAT.to_string()
        };
    }

    let Some(height) = height_limit(quality) else {
        return format.to_string();
    };

    format
        .split('/')
        .map(|alternative| {
            alternative
                .split('+')
                .map(|part| {
                    if is_audio_selector(part) {
                        part.to_string()
                    } else {
                        format!("{part}[height<={height}]")
                    }
                })
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Full argument list for downloading `job`, URL last.
pub fn build_download_args(job: &Job) -> Vec<String> {
    let output = job.output_dir.join(&job.filename_template);

    let mut args = vec![
        "-f".to_owned(),
        format_expression(&job.format, &job.quality, job.audio_only),
        "-o".to_owned(),
        output.to_string_lossy().into_owned(),
        "--newline".to_owned(),
        "--progress".to_owned(),
        "--no-colors".to_owned(),
    ];

    if job.subtitles {
        args.extend(["--write-sub", "--sub-lang", "en"].map(String::from));
    }

    args.push(if job.playlist { "--yes-playlist" } else { "--no-playlist" }.to_owned());
    args.push(job.url.clone());
    args
}

/// Runs the downloader for one job, forwarding progress as it streams in.
///
/// Resolves once the process exits. A non-zero exit becomes
/// [`AppError::ToolFailed`] carrying whatever the tool wrote to stderr.
pub async fn spawn_download(
    tool: &Tool,
    queued: &QueuedJob,
    events: &UnboundedSender<WorkerEvent>,
) -> Result<()> {
    let args = build_download_args(&queued.job);
    debug!(id = %queued.id, ?args, "spawning downloader");

    let mut child = tool
        .command(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| AppError::Spawn {
            program: tool.name(),
            source,
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("downloader stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("downloader stderr was not captured"))?;

    // Drain stderr alongside stdout so a chatty tool never blocks on a full pipe.
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = BufReader::new(stderr).read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    });

    let mut lines = BufReader::new(stdout).split(b'\n');
    while let Some(raw) = lines.next_segment().await? {
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end_matches('\r');
        if let Some(update) = parse_progress_update(line) {
            debug!(id = %queued.id, percent = update.percent, "progress");
            let _ = events.send(WorkerEvent::Progress {
                id: queued.id,
                update,
            });
        }
    }

    let status = child.wait().await?;
    let stderr = stderr_task.await.unwrap_or_default();

    if status.success() {
        Ok(())
    } else {
        Err(AppError::ToolFailed {
            program: tool.name(),
            code: status.code(),
            stderr: stderr.trim().to_string(),
        })
    }
}

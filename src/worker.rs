use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::downloader::{Tool, spawn_download};
use crate::model::{JobId, JobStatus};
use crate::progress::ProgressUpdate;
use crate::queue::JobQueue;

/// Status updates sent from the worker to the window
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// The worker picked up a job and is launching the downloader
    Started { id: JobId, url: String },
    /// A progress line was parsed from the downloader's output
    Progress { id: JobId, update: ProgressUpdate },
    /// The downloader exited with code 0
    Completed { id: JobId },
    /// The downloader could not start or exited non-zero
    Failed { id: JobId, detail: String },
}

/// Executes queued jobs one at a time, forever.
///
/// Blocks on the queue while it is empty. A failed job is recorded and the
/// loop moves on to the next one; nothing here ends the loop. Sends to a
/// closed event channel are dropped silently.
pub async fn run_worker(queue: Arc<JobQueue>, tool: Tool, events: UnboundedSender<WorkerEvent>) {
    info!(tool = %tool.name(), "download worker started");
    loop {
        let queued = queue.dequeue().await;
        let id = queued.id;

        queue.set_status(id, JobStatus::Downloading);
        info!(%id, url = %queued.job.url, "download started");
        let _ = events.send(WorkerEvent::Started {
            id,
            url: queued.job.url.clone(),
        });

        match spawn_download(&tool, &queued, &events).await {
            Ok(()) => {
                queue.set_status(id, JobStatus::Completed);
                info!(%id, "download completed");
                let _ = events.send(WorkerEvent::Completed { id });
            }
            Err(err) => {
                queue.set_status(id, JobStatus::Failed);
                warn!(%id, error = %err, "download failed");
                let _ = events.send(WorkerEvent::Failed {
                    id,
                    detail: err.to_string(),
                });
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::model::Job;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    /// Fake downloader: records the URL it was given, fails for URLs that
    /// contain "fail", otherwise prints two progress lines.
    fn fake_tool(dir: &Path) -> (Tool, PathBuf) {
        let log = dir.join("calls.log");
        let script = dir.join("fake-ytdlp.sh");
        let body = format!(
            r#"for last; do :; done
echo "$last" >> "{log}"
case "$last" in
  *fail*) echo "ERROR: unsupported URL: $last" >&2; exit 1 ;;
esac
echo "[info] extracting"
echo "[download]  50.0% of 1.00MiB at 2.00MiB/s ETA 00:01"
echo "[download] 100% of 1.00MiB"
exit 0
"#,
            log = log.display()
        );
        std::fs::write(&script, body).unwrap();
        (Tool::new("sh").with_args([script.to_string_lossy().into_owned()]), log)
    }

    fn job(url: &str, dir: &Path) -> Job {
        Job {
            url: url.to_string(),
            format: "best".to_string(),
            quality: "720p".to_string(),
            output_dir: dir.to_path_buf(),
            subtitles: false,
            playlist: false,
            audio_only: false,
            filename_template: "%(title)s.%(ext)s".to_string(),
        }
    }

    /// Collects events until `count` jobs have finished one way or another.
    async fn collect(rx: &mut UnboundedReceiver<WorkerEvent>, count: usize) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        let mut finished = 0;
        while finished < count {
            let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("worker stalled")
                .expect("worker hung up");
            if matches!(event, WorkerEvent::Completed { .. } | WorkerEvent::Failed { .. }) {
                finished += 1;
            }
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn runs_jobs_in_order_and_survives_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, log) = fake_tool(dir.path());
        let queue = Arc::new(JobQueue::new());

        let first = queue.enqueue(job("https://example.com/one", dir.path())).unwrap();
        let second = queue.enqueue(job("https://example.com/fail", dir.path())).unwrap();
        let third = queue.enqueue(job("https://example.com/three", dir.path())).unwrap();

        let (tx, mut rx) = unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::clone(&queue), tool, tx));
        let events = collect(&mut rx, 3).await;
        worker.abort();

        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(
            calls.lines().collect::<Vec<_>>(),
            ["https://example.com/one", "https://example.com/fail", "https://example.com/three"]
        );

        assert_eq!(queue.status_of(first), Some(JobStatus::Completed));
        assert_eq!(queue.status_of(second), Some(JobStatus::Failed));
        assert_eq!(queue.status_of(third), Some(JobStatus::Completed));

        let failure = events
            .iter()
            .find_map(|e| match e {
                WorkerEvent::Failed { id, detail } if *id == second => Some(detail.clone()),
                _ => None,
            })
            .unwrap();
        assert!(failure.contains("ERROR: unsupported URL"), "{failure}");

        let percents: Vec<f32> = events
            .iter()
            .filter_map(|e| match e {
                WorkerEvent::Progress { id, update } if *id == first => Some(update.percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, [50.0, 100.0]);
    }

    #[tokio::test]
    async fn one_job_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, _log) = fake_tool(dir.path());
        let queue = Arc::new(JobQueue::new());
        for n in 0..3 {
            queue
                .enqueue(job(&format!("https://example.com/{n}"), dir.path()))
                .unwrap();
        }

        let (tx, mut rx) = unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::clone(&queue), tool, tx));
        let events = collect(&mut rx, 3).await;
        worker.abort();

        // every Started is followed by that job's terminal event before the next Started
        let mut running: Option<JobId> = None;
        for event in &events {
            match event {
                WorkerEvent::Started { id, .. } => {
                    assert_eq!(running, None);
                    running = Some(*id);
                }
                WorkerEvent::Completed { id } | WorkerEvent::Failed { id, .. } => {
                    assert_eq!(running, Some(*id));
                    running = None;
                }
                WorkerEvent::Progress { id, .. } => assert_eq!(running, Some(*id)),
            }
        }
    }

    #[tokio::test]
    async fn missing_tool_fails_job_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(JobQueue::new());
        let a = queue.enqueue(job("https://example.com/a", dir.path())).unwrap();
        let b = queue.enqueue(job("https://example.com/b", dir.path())).unwrap();

        let (tx, mut rx) = unbounded_channel();
        let tool = Tool::new(dir.path().join("no-such-downloader"));
        let worker = tokio::spawn(run_worker(Arc::clone(&queue), tool, tx));
        let events = collect(&mut rx, 2).await;
        worker.abort();

        assert_eq!(queue.status_of(a), Some(JobStatus::Failed));
        assert_eq!(queue.status_of(b), Some(JobStatus::Failed));
        assert!(events.iter().any(|e| matches!(
            e,
            WorkerEvent::Failed { detail, .. } if detail.starts_with("failed to launch")
        )));
    }

    #[tokio::test]
    async fn picks_up_jobs_enqueued_while_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (tool, _log) = fake_tool(dir.path());
        let queue = Arc::new(JobQueue::new());

        let (tx, mut rx) = unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::clone(&queue), tool, tx));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let id = queue.enqueue(job("https://example.com/later", dir.path())).unwrap();
        collect(&mut rx, 1).await;
        worker.abort();

        assert_eq!(queue.status_of(id), Some(JobStatus::Completed));
    }
}

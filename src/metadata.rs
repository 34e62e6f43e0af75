use eframe::egui::ColorImage;
use serde::Deserialize;
use tracing::{info, warn};

use crate::downloader::Tool;
use crate::error::{AppError, Result};
use crate::thumbnail::fetch_thumbnail;

/// Shown for any field the downloader did not report
const PLACEHOLDER: &str = "N/A";

/// Descriptive fields read from `--dump-json` output
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoInfo {
    pub title: Option<String>,
    #[serde(rename = "duration_string")]
    pub duration: Option<String>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    /// Thumbnail image URL
    pub thumbnail: Option<String>,
}

impl VideoInfo {
    /// Label/value pairs for the info panel, with placeholders filled in.
    pub fn display_rows(&self) -> [(&'static str, String); 4] {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| PLACEHOLDER.to_string());
        [
            ("Title", text(&self.title)),
            ("Duration", text(&self.duration)),
            ("Uploader", text(&self.uploader)),
            (
                "Views",
                self.view_count
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
            ),
        ]
    }
}

/// Video information plus its decoded thumbnail
pub struct VideoDetails {
    pub info: VideoInfo,
    pub thumbnail: Option<ColorImage>,
}

/// Asks the downloader for a single item's metadata without downloading it.
pub async fn fetch_metadata(tool: &Tool, url: &str) -> Result<VideoInfo> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::EmptyUrl);
    }

    let output = tool
        .command(["--dump-json", "--no-playlist", url])
        .output()
        .await
        .map_err(|source| AppError::Spawn {
            program: tool.name(),
            source,
        })?;

    if !output.status.success() {
        return Err(AppError::ToolFailed {
            program: tool.name(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(serde_json::from_slice(&output.stdout)?)
}

/// Metadata followed by the thumbnail, if one is advertised. Any failure
/// along the way fails the whole fetch.
pub async fn fetch_video_details(tool: &Tool, url: &str) -> Result<VideoDetails> {
    let info = fetch_metadata(tool, url).await?;
    info!(url, title = info.title.as_deref().unwrap_or(PLACEHOLDER), "fetched video info");

    let thumbnail = match info.thumbnail.clone() {
        Some(thumb_url) => {
            Some(tokio::task::spawn_blocking(move || fetch_thumbnail(&thumb_url)).await??)
        }
        None => None,
    };

    Ok(VideoDetails { info, thumbnail })
}

/// What the info panel currently shows.
///
/// Only a successful fetch replaces the displayed info; a failed one leaves
/// it untouched and records the error for the dialog.
#[derive(Default)]
pub struct InfoPanel {
    pub info: Option<VideoInfo>,
    /// Thumbnail waiting to be uploaded as a texture
    pending_thumbnail: Option<ColorImage>,
    /// Set when the displayed thumbnail should be cleared
    clear_thumbnail: bool,
    pub error: Option<String>,
}

/// Change the window has to make to its thumbnail texture
pub enum ThumbnailChange {
    Replace(ColorImage),
    Clear,
}

impl InfoPanel {
    pub fn apply(&mut self, result: Result<VideoDetails>) {
        match result {
            Ok(details) => {
                self.info = Some(details.info);
                self.clear_thumbnail = details.thumbnail.is_none();
                self.pending_thumbnail = details.thumbnail;
                self.error = None;
            }
            Err(err) => {
                warn!(error = %err, "video info fetch failed");
                self.error = Some(format!("Failed to fetch video information: {err}"));
            }
        }
    }

    pub fn take_thumbnail_change(&mut self) -> Option<ThumbnailChange> {
        if let Some(image) = self.pending_thumbnail.take() {
            return Some(ThumbnailChange::Replace(image));
        }
        if std::mem::take(&mut self.clear_thumbnail) {
            return Some(ThumbnailChange::Clear);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_known_fields_and_fills_placeholders() {
        let info: VideoInfo = serde_json::from_str(
            r#"{"id":"abc","title":"Clip","duration_string":"3:32","view_count":1234,
                "formats":[],"thumbnail":null}"#,
        )
        .unwrap();
        assert_eq!(info.title.as_deref(), Some("Clip"));
        assert_eq!(info.thumbnail, None);

        let rows = info.display_rows();
        assert_eq!(rows[0], ("Title", "Clip".to_string()));
        assert_eq!(rows[1], ("Duration", "3:32".to_string()));
        assert_eq!(rows[2], ("Uploader", "N/A".to_string()));
        assert_eq!(rows[3], ("Views", "1234".to_string()));
    }

    #[test]
    fn failed_fetch_keeps_previous_info() {
        let mut panel = InfoPanel::default();
        panel.apply(Ok(VideoDetails {
            info: VideoInfo {
                title: Some("First".into()),
                ..VideoInfo::default()
            },
            thumbnail: Some(ColorImage::new([2, 2], eframe::egui::Color32::BLACK)),
        }));
        assert!(matches!(panel.take_thumbnail_change(), Some(ThumbnailChange::Replace(_))));

        let bad = serde_json::from_str::<VideoInfo>("not json").unwrap_err();
        panel.apply(Err(bad.into()));

        assert_eq!(panel.info.as_ref().and_then(|i| i.title.as_deref()), Some("First"));
        assert!(panel.take_thumbnail_change().is_none());
        assert!(panel.error.as_deref().unwrap().starts_with("Failed to fetch video information"));
    }

    #[test]
    fn success_without_thumbnail_clears_old_one() {
        let mut panel = InfoPanel::default();
        panel.apply(Ok(VideoDetails {
            info: VideoInfo::default(),
            thumbnail: None,
        }));
        assert!(matches!(panel.take_thumbnail_change(), Some(ThumbnailChange::Clear)));
        assert!(panel.take_thumbnail_change().is_none());
    }

    #[tokio::test]
    async fn empty_url_is_rejected_before_spawning() {
        // a spawn attempt would surface as AppError::Spawn
        let tool = Tool::new("definitely-not-a-real-downloader-binary");
        assert!(matches!(fetch_metadata(&tool, "  ").await, Err(AppError::EmptyUrl)));
    }

    #[cfg(unix)]
    fn scripted_tool(dir: &std::path::Path, body: &str) -> Tool {
        let script = dir.join("fake-ytdlp.sh");
        std::fs::write(&script, body).unwrap();
        Tool::new("sh").with_args([script.to_string_lossy().into_owned()])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn parses_dump_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let tool = scripted_tool(
            dir.path(),
            r#"[ "$1" = "--dump-json" ] && [ "$2" = "--no-playlist" ] || exit 2
echo '{"title":"Demo","uploader":"Someone","duration_string":"1:00","view_count":7}'
"#,
        );
        let info = fetch_metadata(&tool, "https://example.com/v").await.unwrap();
        assert_eq!(info.uploader.as_deref(), Some("Someone"));
        assert_eq!(info.view_count, Some(7));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn malformed_output_is_a_single_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = scripted_tool(dir.path(), "echo 'WARNING: this is not json'\n");
        let err = fetch_video_details(&tool, "https://example.com/v").await.err().unwrap();
        assert!(matches!(err, AppError::Json(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreachable_thumbnail_fails_the_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let tool = scripted_tool(
            dir.path(),
            r#"echo '{"title":"Demo","thumbnail":"http://127.0.0.1:1/x.jpg"}'
"#,
        );
        let err = fetch_video_details(&tool, "https://example.com/v").await.err().unwrap();
        assert!(matches!(err, AppError::Http(_)), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let tool = scripted_tool(dir.path(), "echo 'ERROR: video unavailable' >&2\nexit 1\n");
        let err = fetch_metadata(&tool, "https://example.com/v").await.unwrap_err();
        match err {
            AppError::ToolFailed { code, stderr, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "ERROR: video unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

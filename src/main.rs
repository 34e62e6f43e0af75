//! Desktop front-end that queues yt-dlp downloads and shows their progress

// Launch options
mod config;
// External downloader invocation (yt-dlp)
mod downloader;
// Crate error type
mod error;
// Tracing subscriber setup
mod logging;
// Video information lookup
mod metadata;
// Data models for jobs, history and progress display
mod model;
// Progress parsing utilities
mod progress;
// Pending jobs and download history
mod queue;
// Thumbnail fetching module
mod thumbnail;
// Background download loop
mod worker;

use clap::Parser;
use config::Args;
use downloader::{Tool, format_after_audio_toggle};
use metadata::{InfoPanel, ThumbnailChange, VideoDetails, fetch_video_details};
use model::{FORMAT_PRESETS, Job, JobStatus, LiveProgress, QUALITY_PRESETS};
use queue::JobQueue;
use worker::{WorkerEvent, run_worker};

// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
use egui::{Color32, TextureHandle, TextureOptions, Visuals};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{
    runtime::{Handle, Runtime},
    sync::mpsc::{UnboundedReceiver, unbounded_channel},
};
use tracing::info;

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Program entry point: starts the worker and launches the GUI
fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing();
    let args = Args::parse();

    let runtime = RUNTIME.get_or_try_init(Runtime::new)?;
    let queue = Arc::new(JobQueue::new());
    let (events_tx, events_rx) = unbounded_channel();
    let tool = args.tool();
    runtime.spawn(run_worker(Arc::clone(&queue), tool.clone(), events_tx));

    let app = MyApp::new(&args, tool, queue, events_rx, runtime.handle().clone());
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1000.0, 700.0]),
        ..Default::default()
    };
    info!("opening window");
    eframe::run_native(
        "YouTube Downloader - Powered by yt-dlp",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(visuals(app.dark_mode));
            Box::new(app)
        }),
    )?;
    Ok(())
}

fn visuals(dark: bool) -> Visuals {
    if dark { Visuals::dark() } else { Visuals::light() }
}

/// Application state for the GUI
struct MyApp {
    /// Input field for the video URL
    url_input: String,
    /// Destination folder for downloads
    output_dir: String,
    /// Selected format selector
    format: String,
    /// Selected quality selector
    quality: String,
    /// Output filename template
    filename_template: String,
    subtitles: bool,
    playlist: bool,
    audio_only: bool,
    dark_mode: bool,
    /// How to launch yt-dlp for info lookups
    tool: Tool,
    /// Pending jobs and history, shared with the worker
    queue: Arc<JobQueue>,
    /// Status updates from the worker
    events_rx: UnboundedReceiver<WorkerEvent>,
    /// Progress bar and status line state
    live: LiveProgress,
    /// Displayed video information
    info_panel: InfoPanel,
    /// Texture of the displayed thumbnail
    thumbnail: Option<TextureHandle>,
    /// Incoming info fetch result
    fetch_result: Arc<Mutex<Option<error::Result<VideoDetails>>>>,
    /// True while an info fetch is running
    fetching: bool,
    /// Message shown in the error dialog
    error_message: Option<String>,
    runtime: Handle,
}

impl MyApp {
    fn new(
        args: &Args,
        tool: Tool,
        queue: Arc<JobQueue>,
        events_rx: UnboundedReceiver<WorkerEvent>,
        runtime: Handle,
    ) -> Self {
        Self {
            url_input: String::new(),
            output_dir: args.output_dir().display().to_string(),
            format: args.format.clone(),
            quality: args.quality.clone(),
            filename_template: args.template.clone(),
            subtitles: false,
            playlist: false,
            audio_only: false,
            dark_mode: !args.light,
            tool,
            queue,
            events_rx,
            live: LiveProgress::default(),
            info_panel: InfoPanel::default(),
            thumbnail: None,
            fetch_result: Arc::new(Mutex::new(None)),
            fetching: false,
            error_message: None,
            runtime,
        }
    }

    /// Applies the audio-only toggle to the format field
    fn toggle_audio_only(&mut self) {
        self.format = format_after_audio_toggle(&self.format, self.audio_only);
    }

    fn add_to_queue(&mut self) {
        let job = Job {
            url: self.url_input.clone(),
            format: self.format.clone(),
            quality: self.quality.clone(),
            output_dir: PathBuf::from(&self.output_dir),
            subtitles: self.subtitles,
            playlist: self.playlist,
            audio_only: self.audio_only,
            filename_template: self.filename_template.clone(),
        };
        match self.queue.enqueue(job) {
            Ok(_) => self.url_input.clear(),
            Err(err) => self.error_message = Some(err.to_string()),
        }
    }

    /// Starts an info lookup on the runtime; the result lands in `fetch_result`
    fn fetch_info(&mut self, ctx: &egui::Context) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            self.error_message = Some(error::AppError::EmptyUrl.to_string());
            return;
        }
        self.fetching = true;

        let tool = self.tool.clone();
        let results = Arc::clone(&self.fetch_result);
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let result = fetch_video_details(&tool, &url).await;
            *results.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
            ctx.request_repaint();
        });
    }

    /// Drains worker events and finished info lookups
    fn poll_background(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.events_rx.try_recv() {
            if let WorkerEvent::Failed { detail, .. } = &event {
                self.error_message = Some(format!("Download failed: {detail}"));
            }
            self.live.apply(&event);
        }

        let finished = self
            .fetch_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(result) = finished {
            self.fetching = false;
            self.info_panel.apply(result);
            if let Some(err) = self.info_panel.error.take() {
                self.error_message = Some(err);
            }
        }

        match self.info_panel.take_thumbnail_change() {
            Some(ThumbnailChange::Replace(img)) => {
                self.thumbnail = Some(ctx.load_texture("thumbnail", img, TextureOptions::default()));
            }
            Some(ThumbnailChange::Clear) => self.thumbnail = None,
            None => {}
        }
    }

    fn show_inputs(&mut self, ui: &mut egui::Ui) {
        ui.heading("Video Information");
        ui.horizontal(|ui| {
            ui.label("URL:");
            ui.text_edit_singleline(&mut self.url_input);
            let fetch = ui.add_enabled(!self.fetching, egui::Button::new("Fetch Info"));
            if fetch.clicked() {
                self.fetch_info(ui.ctx());
            }
        });

        ui.group(|ui| {
            if let Some(tex) = &self.thumbnail {
                ui.image(tex);
            }
            match &self.info_panel.info {
                Some(info) => {
                    for (label, value) in info.display_rows() {
                        ui.label(format!("{label}: {value}"));
                    }
                }
                None if self.fetching => {
                    ui.spinner();
                }
                None => {
                    ui.label("No video information loaded.");
                }
            }
        });

        ui.separator();
        ui.heading("Download Options");
        egui::Grid::new("options").num_columns(2).show(ui, |ui| {
            // Free text accepts any selector expression; the combo fills in presets
            ui.label("Format:");
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.format);
                egui::ComboBox::from_id_source("format")
                    .selected_text("Presets")
                    .show_ui(ui, |ui| {
                        for f in FORMAT_PRESETS {
                            ui.selectable_value(&mut self.format, f.to_string(), *f);
                        }
                    });
            });
            ui.end_row();

            ui.label("Quality:");
            ui.add_enabled_ui(!self.audio_only, |ui| {
                ui.horizontal(|ui| {
                    ui.text_edit_singleline(&mut self.quality);
                    egui::ComboBox::from_id_source("quality")
                        .selected_text("Presets")
                        .show_ui(ui, |ui| {
                            for q in QUALITY_PRESETS {
                                ui.selectable_value(&mut self.quality, q.to_string(), *q);
                            }
                        });
                });
            });
            ui.end_row();
        });

        ui.horizontal(|ui| {
            if ui.checkbox(&mut self.audio_only, "Audio Only").changed() {
                self.toggle_audio_only();
            }
            ui.checkbox(&mut self.subtitles, "Download Subtitles");
            ui.checkbox(&mut self.playlist, "Download Playlist");
        });

        ui.separator();
        ui.heading("Output");
        ui.horizontal(|ui| {
            ui.label("Folder:");
            ui.text_edit_singleline(&mut self.output_dir);
            if ui.button("Browse…").clicked() {
                if let Some(folder) = FileDialog::new().set_directory(&self.output_dir).pick_folder() {
                    self.output_dir = folder.display().to_string();
                }
            }
        });
        ui.horizontal(|ui| {
            ui.label("Filename template:");
            ui.text_edit_singleline(&mut self.filename_template);
        });

        ui.add_space(10.0);
        if ui.button("⬇ Add to Queue").clicked() {
            self.add_to_queue();
        }
    }

    fn show_progress_and_history(&self, ui: &mut egui::Ui) {
        ui.heading("Progress");
        ui.add(egui::ProgressBar::new(self.live.fraction).show_percentage());
        ui.label(&self.live.status);
        if !self.live.detail.is_empty() {
            ui.small(&self.live.detail);
        }
        if !self.queue.is_empty() {
            ui.small(format!("{} waiting in queue", self.queue.pending_len()));
        }

        ui.separator();
        ui.heading("Download History");
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                egui::Grid::new("history")
                    .striped(true)
                    .num_columns(5)
                    .show(ui, |ui| {
                        for title in ["URL", "Format", "Quality", "Time", "Status"] {
                            ui.strong(title);
                        }
                        ui.end_row();

                        // newest first
                        for entry in self.queue.history().iter().rev() {
                            ui.label(&entry.url);
                            ui.label(&entry.format);
                            ui.label(&entry.quality);
                            ui.label(entry.timestamp_label());
                            ui.colored_label(status_color(entry.status), entry.status.to_string());
                            ui.end_row();
                        }
                    });
            });
    }

    fn show_error_dialog(&mut self, ctx: &egui::Context) {
        let Some(message) = self.error_message.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.error_message = None;
        }
    }
}

fn status_color(status: JobStatus) -> Color32 {
    match status {
        JobStatus::Queued => Color32::GRAY,
        JobStatus::Downloading => Color32::LIGHT_BLUE,
        JobStatus::Completed => Color32::GREEN,
        JobStatus::Failed => Color32::RED,
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_background(ctx);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("YouTube Downloader");
                let icon = if self.dark_mode { "🌙" } else { "☀" };
                if ui.button(icon).on_hover_text("Toggle theme").clicked() {
                    self.dark_mode = !self.dark_mode;
                    ctx.set_visuals(visuals(self.dark_mode));
                }
            });
        });

        egui::SidePanel::right("progress_panel")
            .min_width(420.0)
            .show(ctx, |ui| self.show_progress_and_history(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| self.show_inputs(ui));
        });

        self.show_error_dialog(ctx);

        // Request periodic repaint for progress updates
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

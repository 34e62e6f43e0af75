use std::path::PathBuf;

use clap::Parser;

use crate::downloader::Tool;
use crate::model::{DEFAULT_FORMAT, DEFAULT_QUALITY, DEFAULT_TEMPLATE};

/// Launch options for the downloader window
#[derive(Parser, Debug, Clone)]
#[command(name = "ytdlp-queue")]
#[command(author, version, about = "Queue-based desktop front-end for yt-dlp", long_about = None)]
pub struct Args {
    /// yt-dlp executable (name on PATH or full path)
    #[arg(long, env = "YTDLP_PATH", default_value = "yt-dlp")]
    pub ytdlp: PathBuf,

    /// Extra argument passed to every yt-dlp call; repeat for more
    #[arg(long = "ytdlp-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub ytdlp_args: Vec<String>,

    /// Initial output directory (default: current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Initial format selector
    #[arg(short, long, default_value = DEFAULT_FORMAT)]
    pub format: String,

    /// Initial quality (best, worst or a height such as 720p)
    #[arg(short, long, default_value = DEFAULT_QUALITY)]
    pub quality: String,

    /// Initial output filename template
    #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
    pub template: String,

    /// Start with the light theme
    #[arg(long)]
    pub light: bool,
}

impl Args {
    pub fn tool(&self) -> Tool {
        Tool::new(&self.ytdlp).with_args(self.ytdlp_args.iter().cloned())
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

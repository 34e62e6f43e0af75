use thiserror::Error;

/// Everything that can go wrong while queueing, downloading or fetching info.
///
/// None of these end the application: they are recorded against the job or
/// shown to the user and the worker carries on.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please enter a valid URL.")]
    EmptyUrl,

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} failed ({}): {stderr}", describe_exit(.code))]
    ToolFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed video information: {0}")]
    Json(#[from] serde_json::Error),

    #[error("thumbnail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("thumbnail could not be decoded: {0}")]
    Image(#[from] image::ImageError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, AppError>;

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

use crate::download::error::DownloadError;
use crate::music::ServiceError;
use thiserror::Error;

/// Centralized error type for the crate.
///
/// Batch entry points (orchestrator, relay) never surface it to their callers;
/// they log it and fold it into a report. Everything below them propagates it with `?`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed configuration (bad token format, unreadable config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request fields outside the supported enumerations, empty paths
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credential rejected by a remote party
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Music service errors
    #[error("Music service error: {0}")]
    Service(#[from] ServiceError),

    /// Per-track download errors
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// ID3 tag read/write errors
    #[error("Tag error: {0}")]
    Tag(#[from] id3::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A network call did not finish within the configured timeout
    #[error("Timed out after {0:?}: {1}")]
    Timeout(std::time::Duration, &'static str),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Short label for log lines.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Validation(_) => "validation",
            AppError::Auth(_) => "auth",
            AppError::Service(_) => "service",
            AppError::Download(e) => e.subcategory(),
            AppError::Http(_) => "http",
            AppError::Telegram(_) => "telegram",
            AppError::Tag(_) => "tag",
            AppError::Io(_) => "io",
            AppError::Timeout(..) => "timeout",
        }
    }
}

/// Runs `fut` with a deadline. `what` names the call in the error message.
pub async fn with_timeout<T, F>(limit: std::time::Duration, what: &'static str, fut: F) -> AppResult<T>
where
    F: std::future::Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout(limit, what)),
    }
}

use std::fmt;

/// Structured error type for a single track's download.
///
/// Each variant is item-fatal only: the orchestrator logs it, skips the track
/// and carries on with the batch.
#[derive(Debug)]
pub enum DownloadError {
    /// Track has no usable title to build a file name from
    EmptyTitle(String),
    /// Service offers no variant with the requested codec and bitrate
    NoVariant(String),
    /// Direct link could not be resolved
    Link(String),
    /// Transfer failed midway (connection reset, bad status, short write)
    Transfer(String),
    /// Expected file not found after the transfer
    FileNotFound(String),
    /// Tags could not be written to the saved file
    Tagging(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for DownloadError {}

impl DownloadError {
    /// Returns subcategory for log lines
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::EmptyTitle(_) => "empty_title",
            DownloadError::NoVariant(_) => "no_variant",
            DownloadError::Link(_) => "link",
            DownloadError::Transfer(_) => "transfer",
            DownloadError::FileNotFound(_) => "file_not_found",
            DownloadError::Tagging(_) => "tagging",
        }
    }

    /// Returns the inner message
    pub fn message(&self) -> &str {
        match self {
            DownloadError::EmptyTitle(msg)
            | DownloadError::NoVariant(msg)
            | DownloadError::Link(msg)
            | DownloadError::Transfer(msg)
            | DownloadError::FileNotFound(msg)
            | DownloadError::Tagging(msg) => msg,
        }
    }
}

//! Track resolution, downloading and tagging

pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod resolver;

pub use error::DownloadError;
pub use pipeline::{BatchReport, DownloadOrchestrator, DownloadRequest, DownloadedTrack, ValidRequest};
pub use resolver::{TrackEntry, TrackList, TrackQuery, TrackResolver};

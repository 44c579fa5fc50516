//! Remote music service abstraction.
//!
//! Provides the `MusicService` trait consumed by the resolver and the
//! orchestrator, plus the track model it produces. `YandexMusicClient` is the
//! built-in backend; tests plug in their own.

pub mod yandex;

pub use yandex::YandexMusicClient;

use crate::core::types::{Bitrate, Codec};
use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Failures reported by a music service backend.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Token missing, malformed or rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Track or resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// No download variant with the requested codec/bitrate
    #[error("no {codec}/{bitrate} variant available")]
    Unavailable { codec: Codec, bitrate: Bitrate },

    /// Unexpected response shape or status
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local write failure while saving a download
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Track identifier: numeric id or composite `"album_id:track_id"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn composite(album_id: impl fmt::Display, track_id: impl fmt::Display) -> Self {
        Self(format!("{}:{}", album_id, track_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare track id the API endpoints expect.
    pub fn track_part(&self) -> &str {
        match self.0.split_once(':') {
            Some((_, track)) => track,
            None => &self.0,
        }
    }

    pub fn album_part(&self) -> Option<&str> {
        self.0.split_once(':').map(|(album, _)| album)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        TrackId::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        TrackId::new(id)
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        TrackId(id.to_string())
    }
}

/// Full metadata of one remote track.
///
/// Immutable once fetched, except for the direct link, which is resolved at
/// most once and then reused.
#[derive(Debug, Clone, Default)]
pub struct TrackDescriptor {
    pub id: TrackId,
    pub title: String,
    pub artists: Vec<String>,
    pub album_title: String,
    /// Total number of tracks on the album (not this track's position)
    pub album_track_count: Option<u32>,
    /// Cover URI template as returned by the service (`.../%%`)
    pub cover_uri: Option<String>,
    direct_link: OnceLock<String>,
}

impl Default for TrackId {
    fn default() -> Self {
        TrackId(String::new())
    }
}

impl TrackDescriptor {
    pub fn new(id: impl Into<TrackId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artists = artists.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_album(mut self, title: impl Into<String>, track_count: Option<u32>) -> Self {
        self.album_title = title.into();
        self.album_track_count = track_count;
        self
    }

    #[must_use]
    pub fn with_cover_uri(mut self, uri: impl Into<String>) -> Self {
        self.cover_uri = Some(uri.into());
        self
    }

    /// Artist names joined with `", "`.
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    /// Cover art URL at 400x400, if the track has a cover.
    pub fn cover_url(&self) -> Option<String> {
        self.cover_uri.as_deref().map(|uri| {
            let uri = uri.replace("%%", "400x400");
            if uri.starts_with("http://") || uri.starts_with("https://") {
                uri
            } else {
                format!("https://{}", uri)
            }
        })
    }

    /// Previously resolved direct link, if any.
    pub fn cached_link(&self) -> Option<&str> {
        self.direct_link.get().map(String::as_str)
    }

    /// Remembers a resolved link. The first stored link wins.
    pub fn remember_link(&self, link: String) -> &str {
        self.direct_link.get_or_init(|| link)
    }
}

/// One downloadable encoding of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadVariant {
    pub codec: Codec,
    pub bitrate: Bitrate,
    /// Service-specific URL used to resolve the direct link
    pub info_url: String,
}

/// Account behind the service credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub uid: u64,
    pub login: Option<String>,
}

/// Picks the variant matching `codec` and `bitrate` exactly.
pub fn select_variant(variants: &[DownloadVariant], codec: Codec, bitrate: Bitrate) -> Option<&DownloadVariant> {
    variants.iter().find(|v| v.codec == codec && v.bitrate == bitrate)
}

/// Capabilities the sync pipeline needs from a music streaming service.
#[async_trait]
pub trait MusicService: Send + Sync {
    /// Human-readable backend name for log lines
    fn name(&self) -> &str;

    /// Validates the credential. Must be idempotent.
    async fn authenticate(&self) -> Result<AccountInfo, ServiceError>;

    /// Liked tracks of the authenticated account, most recent first.
    async fn liked_tracks(&self) -> Result<Vec<TrackId>, ServiceError>;

    /// Full descriptors for `ids`, in the order given. Unknown ids are omitted.
    async fn tracks(&self, ids: &[TrackId]) -> Result<Vec<TrackDescriptor>, ServiceError>;

    /// Encodings the service offers for a track.
    async fn download_info(&self, id: &TrackId) -> Result<Vec<DownloadVariant>, ServiceError>;

    /// Resolves a variant into a direct streaming URL.
    async fn direct_link(&self, variant: &DownloadVariant) -> Result<String, ServiceError>;

    /// Streams `link` into the file at `path`, returning bytes written.
    async fn download_to(&self, link: &str, path: &Path) -> Result<u64, ServiceError>;
}

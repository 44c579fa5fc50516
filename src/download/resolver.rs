//! Track resolution: turns ids or the liked-tracks request into a `TrackList`.

use crate::core::error::{with_timeout, AppError, AppResult};
use crate::core::types::{Bitrate, Codec, Window};
use crate::music::{select_variant, AccountInfo, MusicService, ServiceError, TrackDescriptor, TrackId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Encoding used for link relays.
pub const STREAM_CODEC: Codec = Codec::Mp3;
pub const STREAM_BITRATE: Bitrate = Bitrate::Kbps192;

/// One position in a track list: either fully fetched or a handle that still
/// needs a metadata round-trip.
#[derive(Debug, Clone)]
pub enum TrackEntry {
    Full(TrackDescriptor),
    Handle(TrackId),
}

impl TrackEntry {
    pub fn id(&self) -> &TrackId {
        match self {
            TrackEntry::Full(track) => &track.id,
            TrackEntry::Handle(id) => id,
        }
    }
}

/// Ordered tracks produced by the resolver; consumed once by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct TrackList {
    entries: Vec<TrackEntry>,
}

impl TrackList {
    pub fn new(entries: Vec<TrackEntry>) -> Self {
        Self { entries }
    }

    pub fn from_descriptors(tracks: Vec<TrackDescriptor>) -> Self {
        Self::new(tracks.into_iter().map(TrackEntry::Full).collect())
    }

    pub fn from_ids(ids: Vec<TrackId>) -> Self {
        Self::new(ids.into_iter().map(TrackEntry::Handle).collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TrackEntry] {
        &self.entries
    }

    #[must_use]
    pub fn window(self, window: Window) -> Self {
        Self::new(window.apply(&self.entries).to_vec())
    }
}

impl IntoIterator for TrackList {
    type Item = TrackEntry;
    type IntoIter = std::vec::IntoIter<TrackEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// What to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackQuery {
    /// Exactly these tracks
    Ids(Vec<TrackId>),
    /// The account's liked tracks
    Liked,
}

impl TrackQuery {
    /// An empty id list means "all liked tracks".
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TrackId>,
    {
        let ids: Vec<TrackId> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            TrackQuery::Liked
        } else {
            TrackQuery::Ids(ids)
        }
    }
}

/// Resolves tracks through a music service.
///
/// Built unauthenticated; [`TrackResolver::connect`] authenticates once. A
/// rejected credential leaves the resolver unusable: every later call yields
/// no tracks instead of failing.
pub struct TrackResolver {
    service: Arc<dyn MusicService>,
    timeout: Duration,
    account: OnceCell<AccountInfo>,
    rejected: AtomicBool,
}

impl TrackResolver {
    pub fn new(service: Arc<dyn MusicService>, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            account: OnceCell::new(),
            rejected: AtomicBool::new(false),
        }
    }

    pub fn service(&self) -> &Arc<dyn MusicService> {
        &self.service
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Authenticates with the service. Repeated calls after success are no-ops.
    pub async fn connect(&self) -> AppResult<&AccountInfo> {
        if self.rejected.load(Ordering::Acquire) {
            return Err(AppError::Auth("music service credential was rejected".to_string()));
        }

        let result = self
            .account
            .get_or_try_init(|| async {
                log::debug!("Authorizing with {}", self.service.name());
                with_timeout(self.timeout, "authenticate", async {
                    self.service.authenticate().await.map_err(AppError::from)
                })
                .await
            })
            .await;

        match result {
            Ok(account) => Ok(account),
            Err(AppError::Service(ServiceError::Unauthorized(reason))) => {
                log::error!("Invalid music service token: {}", reason);
                self.rejected.store(true, Ordering::Release);
                Err(AppError::Auth(reason))
            }
            Err(e) => {
                log::error!("Authorization with {} failed: {}", self.service.name(), e);
                Err(e)
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.account.initialized()
    }

    /// Resolves `query` and applies `window`.
    ///
    /// Liked tracks come back as handles (details are fetched per track by the
    /// orchestrator); explicit ids come back fully fetched.
    pub async fn resolve(&self, query: &TrackQuery, window: Window) -> AppResult<TrackList> {
        if !self.is_connected() {
            log::warn!("Resolver is not authenticated, no tracks resolved");
            return Ok(TrackList::default());
        }

        let list = match query {
            TrackQuery::Liked => {
                log::debug!("Fetching liked tracks");
                let ids = with_timeout(self.timeout, "liked tracks", async {
                    self.service.liked_tracks().await.map_err(AppError::from)
                })
                .await?;
                TrackList::from_ids(ids)
            }
            TrackQuery::Ids(ids) => {
                let tracks = with_timeout(self.timeout, "fetch tracks", async {
                    self.service.tracks(ids).await.map_err(AppError::from)
                })
                .await?;
                if tracks.len() < ids.len() {
                    log::warn!("Service returned {} of {} requested tracks", tracks.len(), ids.len());
                }
                TrackList::from_descriptors(tracks)
            }
        };

        Ok(list.window(window))
    }

    /// Full details for one list entry.
    pub async fn fetch(&self, entry: TrackEntry) -> AppResult<TrackDescriptor> {
        match entry {
            TrackEntry::Full(track) => Ok(track),
            TrackEntry::Handle(id) => {
                if !self.is_connected() {
                    return Err(AppError::Auth("music service is not authenticated".to_string()));
                }
                log::debug!("Fetching track info for {}", id);
                let tracks = with_timeout(self.timeout, "fetch track", async {
                    self.service
                        .tracks(std::slice::from_ref(&id))
                        .await
                        .map_err(AppError::from)
                })
                .await?;
                tracks
                    .into_iter()
                    .next()
                    .ok_or_else(|| AppError::Service(ServiceError::NotFound(format!("track {}", id))))
            }
        }
    }

    /// Direct link for one encoding of a track. Not cached.
    pub async fn resolve_link(&self, id: &TrackId, codec: Codec, bitrate: Bitrate) -> AppResult<String> {
        if !self.is_connected() {
            return Err(AppError::Auth("music service is not authenticated".to_string()));
        }

        let variants = with_timeout(self.timeout, "download info", async {
            self.service.download_info(id).await.map_err(AppError::from)
        })
        .await?;
        let variant = select_variant(&variants, codec, bitrate)
            .ok_or(AppError::Service(ServiceError::Unavailable { codec, bitrate }))?;

        with_timeout(self.timeout, "direct link", async {
            self.service.direct_link(variant).await.map_err(AppError::from)
        })
        .await
    }

    /// Streaming link used for link relays (mp3/192), resolved at most once per descriptor.
    pub async fn streaming_link(&self, track: &TrackDescriptor) -> AppResult<String> {
        if let Some(link) = track.cached_link() {
            return Ok(link.to_string());
        }
        let link = self.resolve_link(&track.id, STREAM_CODEC, STREAM_BITRATE).await?;
        Ok(track.remember_link(link).to_string())
    }
}

//! In-memory music service
//!
//! Serves a fixed liked list, offers every mp3/aac variant unless told
//! otherwise, and "downloads" a few bytes per track. Counts calls so tests can
//! check what actually hit the service.

#![allow(dead_code)]

use async_trait::async_trait;
use likesync::core::types::{Bitrate, Codec};
use likesync::music::{AccountInfo, DownloadVariant, MusicService, ServiceError, TrackDescriptor, TrackId};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const AUDIO_BYTES: &[u8] = b"fake-audio-payload";

/// ID3 magic followed by a major version no reader supports.
pub const CORRUPT_TAG_BYTES: &[u8] = b"ID3\x09\x00\x00\x00\x00\x00\x10fake-audio-payload";

#[derive(Default)]
pub struct MockMusicService {
    /// Liked tracks, in list order
    pub liked: Vec<TrackDescriptor>,
    pub reject_token: bool,
    /// Track ids that have no variants at all
    pub no_variants: HashSet<String>,
    /// Track ids whose transfer fails
    pub failing_downloads: HashSet<String>,
    /// Track ids whose transfer writes a few bytes and then hangs
    pub stalling_downloads: HashSet<String>,
    /// Track ids whose payload starts with an unreadable ID3 header
    pub corrupt_tags: HashSet<String>,

    pub auth_calls: AtomicUsize,
    pub link_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
}

impl MockMusicService {
    pub fn with_tracks(liked: Vec<TrackDescriptor>) -> Self {
        Self {
            liked,
            ..Default::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_token: true,
            ..Default::default()
        }
    }

    pub fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn links(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
    }

    pub fn auths(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    fn find(&self, id: &TrackId) -> Option<&TrackDescriptor> {
        self.liked
            .iter()
            .find(|t| t.id == *id || t.id.track_part() == id.track_part())
    }
}

fn matches_link(ids: &HashSet<String>, link: &str) -> bool {
    ids.iter().any(|id| link.starts_with(&format!("https://cdn.example/{}/", id)))
}

/// `mock://<track id>/<codec>/<kbps>`
fn info_url(id: &TrackId, codec: Codec, bitrate: Bitrate) -> String {
    format!("mock://{}/{}/{}", id, codec, bitrate.kbps())
}

#[async_trait]
impl MusicService for MockMusicService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn authenticate(&self) -> Result<AccountInfo, ServiceError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_token {
            return Err(ServiceError::Unauthorized("bad token".to_string()));
        }
        Ok(AccountInfo {
            uid: 1,
            login: Some("tester".to_string()),
        })
    }

    async fn liked_tracks(&self) -> Result<Vec<TrackId>, ServiceError> {
        Ok(self.liked.iter().map(|t| t.id.clone()).collect())
    }

    async fn tracks(&self, ids: &[TrackId]) -> Result<Vec<TrackDescriptor>, ServiceError> {
        Ok(ids.iter().filter_map(|id| self.find(id).cloned()).collect())
    }

    async fn download_info(&self, id: &TrackId) -> Result<Vec<DownloadVariant>, ServiceError> {
        if self.no_variants.contains(id.as_str()) {
            return Ok(Vec::new());
        }
        let mut variants = Vec::new();
        for codec in [Codec::Mp3, Codec::Aac] {
            for bitrate in Bitrate::ALL {
                variants.push(DownloadVariant {
                    codec,
                    bitrate,
                    info_url: info_url(id, codec, bitrate),
                });
            }
        }
        Ok(variants)
    }

    async fn direct_link(&self, variant: &DownloadVariant) -> Result<String, ServiceError> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        Ok(variant.info_url.replace("mock://", "https://cdn.example/"))
    }

    async fn download_to(&self, link: &str, path: &Path) -> Result<u64, ServiceError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if matches_link(&self.failing_downloads, link) {
            return Err(ServiceError::Protocol("connection reset".to_string()));
        }
        if matches_link(&self.stalling_downloads, link) {
            tokio::fs::write(path, &AUDIO_BYTES[..4]).await?;
            tokio::time::sleep(Duration::from_secs(30)).await;
            return Ok(4);
        }
        if matches_link(&self.corrupt_tags, link) {
            tokio::fs::write(path, CORRUPT_TAG_BYTES).await?;
            return Ok(CORRUPT_TAG_BYTES.len() as u64);
        }
        tokio::fs::write(path, AUDIO_BYTES).await?;
        Ok(AUDIO_BYTES.len() as u64)
    }
}

//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

pub mod mock_service;
pub mod recorder;

pub use mock_service::{MockMusicService, AUDIO_BYTES};
pub use recorder::RecordingTransport;

use likesync::download::TrackResolver;
use likesync::music::{TrackDescriptor, TrackId};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// "Song <n>" by "Artist" on a 12-track album, with a cover.
pub fn track(n: u32) -> TrackDescriptor {
    TrackDescriptor::new(TrackId::composite(100, n), format!("Song {}", n))
        .with_artists(["Artist"])
        .with_album("Album", Some(12))
        .with_cover_uri("avatars.yandex.net/get-music-content/x/%%")
}

pub fn tracks(range: std::ops::Range<u32>) -> Vec<TrackDescriptor> {
    range.map(track).collect()
}

pub async fn connected_resolver(service: Arc<MockMusicService>) -> Arc<TrackResolver> {
    let resolver = Arc::new(TrackResolver::new(service, TIMEOUT));
    resolver.connect().await.expect("mock service accepts the token");
    resolver
}

/// Creates `<root>/<dir>` with the given empty-ish files.
pub fn seed_dir(root: &Path, dir: &str, files: &[&str]) {
    let dir = root.join(dir);
    std::fs::create_dir_all(&dir).unwrap();
    for file in files {
        std::fs::write(dir.join(file), b"existing").unwrap();
    }
}

pub fn titles(paths: &[likesync::download::DownloadedTrack]) -> Vec<String> {
    paths.iter().map(|d| d.track.title.clone()).collect()
}

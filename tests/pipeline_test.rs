//! Integration tests for the download orchestrator
//!
//! Run with: cargo test --test pipeline_test

mod common;

use common::*;
use likesync::core::types::Window;
use likesync::download::metadata::read_tags;
use likesync::download::{DownloadOrchestrator, DownloadRequest, TrackQuery, TrackResolver};
use likesync::storage::LocalLibrary;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

async fn run(
    service: Arc<MockMusicService>,
    root: &TempDir,
    request: DownloadRequest,
) -> likesync::download::BatchReport {
    let resolver = connected_resolver(service).await;
    let tracks = resolver.resolve(&TrackQuery::Liked, Window::all()).await.unwrap();
    let orchestrator = DownloadOrchestrator::new(resolver, LocalLibrary::new(root.path()));
    orchestrator.download(tracks, &request).await
}

#[tokio::test]
async fn test_downloads_and_tags_liked_tracks() {
    let root = TempDir::new().unwrap();
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..3)));

    let report = run(service.clone(), &root, DownloadRequest::default()).await;

    assert!(!report.is_aborted());
    assert_eq!(titles(&report.downloaded), vec!["Song 0", "Song 1", "Song 2"]);
    assert_eq!(service.downloads(), 3);

    let path = root.path().join("tracks").join("Song 0.mp3");
    assert!(path.is_file());
    let tags = read_tags(&path).unwrap();
    assert_eq!(tags.title, "Song 0");
    assert_eq!(tags.artist, "Artist");
    assert_eq!(tags.album, "Album");
    assert_eq!(tags.track_number, Some(12));
}

#[tokio::test]
async fn test_existing_files_are_skipped() {
    let root = TempDir::new().unwrap();
    seed_dir(root.path(), "tracks", &["Song 1.mp3"]);
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..3)));

    let report = run(service.clone(), &root, DownloadRequest::default()).await;

    assert_eq!(titles(&report.downloaded), vec!["Song 0", "Song 2"]);
    assert_eq!(report.skipped, vec!["Song 1.mp3"]);
    assert_eq!(service.downloads(), 2);
    // untouched
    assert_eq!(std::fs::read(root.path().join("tracks/Song 1.mp3")).unwrap(), b"existing");
}

#[tokio::test]
async fn test_allow_duplicates_downloads_again() {
    let root = TempDir::new().unwrap();
    seed_dir(root.path(), "tracks", &["Song 0.mp3"]);
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..1)));

    let request = DownloadRequest {
        allow_duplicates: true,
        ..Default::default()
    };
    let report = run(service.clone(), &root, request).await;

    assert_eq!(report.downloaded.len(), 1);
    assert!(report.skipped.is_empty());
    assert_eq!(service.downloads(), 1);
}

#[tokio::test]
async fn test_offset_and_count_window() {
    let root = TempDir::new().unwrap();
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..20)));

    let request = DownloadRequest {
        offset: 5,
        count: 3,
        ..Default::default()
    };
    let report = run(service.clone(), &root, request).await;

    assert_eq!(titles(&report.downloaded), vec!["Song 5", "Song 6", "Song 7"]);
    assert_eq!(service.downloads(), 3);
}

#[tokio::test]
async fn test_count_only_counts_downloads() {
    let root = TempDir::new().unwrap();
    seed_dir(root.path(), "tracks", &["Song 0.mp3", "Song 1.mp3"]);
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..5)));

    let request = DownloadRequest {
        count: 2,
        ..Default::default()
    };
    let report = run(service, &root, request).await;

    assert_eq!(report.skipped.len(), 2);
    assert_eq!(titles(&report.downloaded), vec!["Song 2", "Song 3"]);
}

#[tokio::test]
async fn test_zero_count_downloads_everything() {
    let root = TempDir::new().unwrap();
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..15)));

    let request = DownloadRequest {
        count: 0,
        ..Default::default()
    };
    let report = run(service, &root, request).await;

    assert_eq!(report.downloaded.len(), 15);
}

#[tokio::test]
async fn test_unsupported_codec_aborts_before_io() {
    let root = TempDir::new().unwrap();
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..3)));

    let request = DownloadRequest {
        codec: "flac".to_string(),
        directory: "fresh".to_string(),
        ..Default::default()
    };
    let report = run(service.clone(), &root, request).await;

    assert!(report.is_aborted());
    assert!(report.downloaded.is_empty());
    assert_eq!(service.downloads(), 0);
    assert!(!root.path().join("fresh").exists());
}

#[tokio::test]
async fn test_unsupported_bitrate_aborts() {
    let root = TempDir::new().unwrap();
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..3)));

    let request = DownloadRequest {
        bitrate: 256,
        ..Default::default()
    };
    let report = run(service.clone(), &root, request).await;

    assert!(report.is_aborted());
    assert_eq!(service.downloads(), 0);
}

#[tokio::test]
async fn test_aac_extension() {
    let root = TempDir::new().unwrap();
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..1)));

    let request = DownloadRequest {
        codec: "aac".to_string(),
        bitrate: 128,
        ..Default::default()
    };
    let report = run(service, &root, request).await;

    assert_eq!(report.downloaded.len(), 1);
    assert!(root.path().join("tracks").join("Song 0.aac").is_file());
}

#[tokio::test]
async fn test_failed_track_does_not_stop_batch() {
    let root = TempDir::new().unwrap();
    let mut service = MockMusicService::with_tracks(tracks(0..4));
    service.failing_downloads.insert("100:1".to_string());
    service.no_variants.insert("100:2".to_string());
    let service = Arc::new(service);

    let report = run(service.clone(), &root, DownloadRequest::default()).await;

    assert_eq!(titles(&report.downloaded), vec!["Song 0", "Song 3"]);
    let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["100:1", "100:2"]);
    assert!(report.failed[0].1.contains("connection reset"), "{}", report.failed[0].1);
    assert!(report.failed[1].1.contains("no mp3/192kbps variant"), "{}", report.failed[1].1);
    assert!(!root.path().join("tracks").join("Song 1.mp3").exists());
}

#[tokio::test]
async fn test_untitled_track_fails_alone() {
    let root = TempDir::new().unwrap();
    let mut liked = tracks(0..2);
    liked.insert(1, likesync::music::TrackDescriptor::new("100:99", "!!!"));
    let service = Arc::new(MockMusicService::with_tracks(liked));

    let report = run(service, &root, DownloadRequest::default()).await;

    assert_eq!(report.downloaded.len(), 2);
    assert_eq!(report.failed.len(), 1);
}

#[tokio::test]
async fn test_unauthenticated_resolver_downloads_nothing() {
    let root = TempDir::new().unwrap();
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..3)));
    let resolver = Arc::new(TrackResolver::new(service.clone(), TIMEOUT));

    let tracks = resolver.resolve(&TrackQuery::Liked, Window::all()).await.unwrap();
    assert!(tracks.is_empty());

    let orchestrator = DownloadOrchestrator::new(resolver, LocalLibrary::new(root.path()));
    let report = orchestrator.download(tracks, &DownloadRequest::default()).await;
    assert!(report.is_aborted());
    assert_eq!(service.downloads(), 0);
}

#[tokio::test]
async fn test_cancelled_batch_stops_before_first_track() {
    let root = TempDir::new().unwrap();
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..3)));
    let resolver = connected_resolver(service.clone()).await;
    let tracks = resolver.resolve(&TrackQuery::Liked, Window::all()).await.unwrap();

    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();
    let orchestrator = DownloadOrchestrator::new(resolver, LocalLibrary::new(root.path())).with_cancellation(cancel);
    let report = orchestrator.download(tracks, &DownloadRequest::default()).await;

    assert!(report.cancelled);
    assert!(report.downloaded.is_empty());
    assert_eq!(service.downloads(), 0);
}

#[tokio::test]
async fn test_explicit_ids() {
    let root = TempDir::new().unwrap();
    let service = Arc::new(MockMusicService::with_tracks(tracks(0..5)));
    let resolver = connected_resolver(service).await;

    let query = TrackQuery::from_ids(["100:4", "100:1"]);
    let tracks = resolver.resolve(&query, Window::all()).await.unwrap();
    let orchestrator = DownloadOrchestrator::new(resolver, LocalLibrary::new(root.path()));
    let report = orchestrator.download(tracks, &DownloadRequest::default()).await;

    assert_eq!(titles(&report.downloaded), vec!["Song 4", "Song 1"]);
}

fn files_in(root: &TempDir, dir: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root.path().join(dir))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_stalled_download_leaves_nothing_behind() {
    let root = TempDir::new().unwrap();
    let mut stalling = MockMusicService::with_tracks(tracks(0..2));
    stalling.stalling_downloads.insert("100:0".to_string());
    let stalling = Arc::new(stalling);

    let resolver = Arc::new(TrackResolver::new(stalling, std::time::Duration::from_millis(200)));
    resolver.connect().await.unwrap();
    let list = resolver.resolve(&TrackQuery::Liked, Window::all()).await.unwrap();
    let orchestrator = DownloadOrchestrator::new(resolver, LocalLibrary::new(root.path()));
    let report = orchestrator.download(list, &DownloadRequest::default()).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.as_str(), "100:0");
    assert_eq!(titles(&report.downloaded), vec!["Song 1"]);
    assert_eq!(files_in(&root, "tracks"), vec!["Song 1.mp3"]);

    // The next run is not fooled by the earlier attempt
    let healthy = Arc::new(MockMusicService::with_tracks(tracks(0..2)));
    let report = run(healthy, &root, DownloadRequest::default()).await;
    assert_eq!(titles(&report.downloaded), vec!["Song 0"]);
    assert_eq!(report.skipped, vec!["Song 1.mp3"]);
}

#[tokio::test]
async fn test_unreadable_tag_fails_track_and_keeps_budget() {
    let root = TempDir::new().unwrap();
    let mut service = MockMusicService::with_tracks(tracks(0..3));
    service.corrupt_tags.insert("100:0".to_string());
    let service = Arc::new(service);

    let request = DownloadRequest {
        count: 2,
        ..Default::default()
    };
    let report = run(service, &root, request).await;

    let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(failed, vec!["100:0"]);
    assert_eq!(titles(&report.downloaded), vec!["Song 1", "Song 2"]);
    // Untagged audio is not kept around to be skipped next time
    assert_eq!(files_in(&root, "tracks"), vec!["Song 1.mp3", "Song 2.mp3"]);
}

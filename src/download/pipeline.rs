//! Download orchestrator.
//!
//! Drives a resolved `TrackList` to files on disk:
//!   validate request → prepare directory → dedup snapshot
//!   → per track: fetch details → skip check → download to `.part` → tag → rename
//!
//! Tracks are processed strictly one at a time in list order. A bad request
//! aborts the batch before any I/O; a failing track is logged and skipped.

use crate::core::error::{with_timeout, AppError, AppResult};
use crate::core::types::{Bitrate, Codec, Window};
use crate::core::utils::{sanitize_name, track_file_name};
use crate::download::error::DownloadError;
use crate::download::metadata::tag_file;
use crate::download::resolver::{TrackEntry, TrackList, TrackResolver};
use crate::music::{ServiceError, TrackDescriptor, TrackId};
use crate::storage::library::{LocalFileSet, LocalLibrary};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Parameters of one download batch, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Directory name under the library root (sanitized before use)
    pub directory: String,
    /// `mp3` or `aac`
    pub codec: String,
    /// 64, 128, 192 or 320
    pub bitrate: u32,
    /// Tracks to download; 0 means no limit
    pub count: usize,
    /// Positions to skip at the start of the list
    pub offset: usize,
    /// Download even when the target file already exists
    pub allow_duplicates: bool,
}

impl Default for DownloadRequest {
    fn default() -> Self {
        Self {
            directory: "tracks".to_string(),
            codec: "mp3".to_string(),
            bitrate: 192,
            count: 10,
            offset: 0,
            allow_duplicates: false,
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRequest {
    /// Sanitized, non-empty directory name
    pub directory: String,
    pub codec: Codec,
    pub bitrate: Bitrate,
    pub window: Window,
    pub allow_duplicates: bool,
}

impl DownloadRequest {
    /// Checks codec and bitrate against the supported sets, then the directory name.
    pub fn validate(&self) -> AppResult<ValidRequest> {
        let codec = Codec::from_str(&self.codec).map_err(AppError::Validation)?;
        let bitrate = Bitrate::try_from(self.bitrate).map_err(AppError::Validation)?;

        let directory = sanitize_name(&self.directory);
        if directory.trim().is_empty() {
            return Err(AppError::Validation(format!("Bad directory name: {:?}", self.directory)));
        }

        Ok(ValidRequest {
            directory,
            codec,
            bitrate,
            window: Window::new(self.offset, self.count),
            allow_duplicates: self.allow_duplicates,
        })
    }
}

/// A track that was downloaded and tagged in this batch.
#[derive(Debug, Clone)]
pub struct DownloadedTrack {
    pub track: TrackDescriptor,
    pub path: PathBuf,
    pub bytes: u64,
}

/// What a batch did. Only `downloaded` counts toward the request's `count`.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub downloaded: Vec<DownloadedTrack>,
    /// File names skipped because they already existed
    pub skipped: Vec<String>,
    /// Tracks that failed, with the reason
    pub failed: Vec<(TrackId, String)>,
    /// Set when the batch stopped before the per-track loop
    pub aborted: Option<String>,
    pub cancelled: bool,
}

impl BatchReport {
    pub(crate) fn aborted(reason: impl Into<String>) -> Self {
        Self {
            aborted: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.downloaded.iter().map(|d| d.path.as_path())
    }
}

enum TrackOutcome {
    Downloaded(DownloadedTrack),
    Skipped(String),
}

/// Downloads resolved tracks into the local library.
pub struct DownloadOrchestrator {
    resolver: Arc<TrackResolver>,
    library: LocalLibrary,
    cancel: CancellationToken,
}

impl DownloadOrchestrator {
    pub fn new(resolver: Arc<TrackResolver>, library: LocalLibrary) -> Self {
        Self {
            resolver,
            library,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to stop between tracks.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn library(&self) -> &LocalLibrary {
        &self.library
    }

    pub fn resolver(&self) -> &Arc<TrackResolver> {
        &self.resolver
    }

    /// Runs one batch. Never returns an error: problems end up in the report and the log.
    pub async fn download(&self, tracks: TrackList, request: &DownloadRequest) -> BatchReport {
        let valid = match request.validate() {
            Ok(valid) => valid,
            Err(e) => {
                log::error!("Download request rejected: {}", e);
                return BatchReport::aborted(e.to_string());
            }
        };

        if !self.resolver.is_connected() {
            log::error!("Music service is not authenticated, nothing to download");
            return BatchReport::aborted("music service is not authenticated");
        }

        let dir = match self.prepare_directory(&valid.directory).await {
            Ok(dir) => dir,
            Err(e) => {
                log::error!("Cannot prepare directory {:?}: {}", valid.directory, e);
                return BatchReport::aborted(e.to_string());
            }
        };

        // Snapshot is taken once and never refreshed during the batch
        let snapshot = if valid.allow_duplicates {
            LocalFileSet::new()
        } else {
            self.library.snapshot(&valid.directory, valid.codec)
        };

        log::info!(
            "Downloading {} tracks ({}/{}, offset {}, count {}) into {}",
            tracks.len(),
            valid.codec,
            valid.bitrate,
            valid.window.offset,
            valid.window.count,
            dir.display()
        );

        let mut report = BatchReport::default();
        for entry in tracks.into_iter().skip(valid.window.offset) {
            if self.cancel.is_cancelled() {
                log::warn!("Download batch cancelled");
                report.cancelled = true;
                break;
            }
            if !valid.window.is_unbounded() && report.downloaded.len() >= valid.window.count {
                break;
            }

            let id = entry.id().clone();
            match self.process_track(entry, &valid, &dir, &snapshot).await {
                Ok(TrackOutcome::Downloaded(done)) => {
                    log::info!("Saved {} ({} bytes)", done.path.display(), done.bytes);
                    report.downloaded.push(done);
                }
                Ok(TrackOutcome::Skipped(file_name)) => {
                    log::debug!("Already downloaded, skipping {}", file_name);
                    report.skipped.push(file_name);
                }
                Err(e) => {
                    log::error!("Track {} failed [{}]: {}", id, e.category(), e);
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        log::info!(
            "Batch finished: {} downloaded, {} skipped, {} failed",
            report.downloaded.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    async fn prepare_directory(&self, directory: &str) -> AppResult<PathBuf> {
        let dir = self
            .library
            .directory_path(directory)
            .ok_or_else(|| AppError::Validation(format!("Bad directory name: {:?}", directory)))?;

        // create_dir_all treats an existing directory as success
        fs_err::tokio::create_dir_all(&dir).await?;
        Ok(dir)
    }

    async fn process_track(
        &self,
        entry: TrackEntry,
        request: &ValidRequest,
        dir: &Path,
        snapshot: &LocalFileSet,
    ) -> AppResult<TrackOutcome> {
        let track = self.resolver.fetch(entry).await?;

        let file_name = track_file_name(&track.title, request.codec.extension())
            .ok_or_else(|| DownloadError::EmptyTitle(format!("track {} has no usable title", track.id)))?;

        if !request.allow_duplicates && snapshot.contains(&file_name) {
            return Ok(TrackOutcome::Skipped(file_name));
        }

        let path = dir.join(&file_name);
        let link = self
            .resolver
            .resolve_link(&track.id, request.codec, request.bitrate)
            .await
            .map_err(|e| match e {
                AppError::Service(ServiceError::Unavailable { .. }) => {
                    AppError::Download(DownloadError::NoVariant(format!("{} for track {}", e, track.id)))
                }
                AppError::Service(e) => {
                    AppError::Download(DownloadError::Link(format!("track {}: {}", track.id, e)))
                }
                e => e,
            })?;

        // Bytes land in `<name>.part` and only take the final name once tagged,
        // so the next snapshot never sees a truncated or untagged file.
        let partial = partial_path(&path);
        log::debug!("Saving track {} to {}", track.id, partial.display());
        let bytes = match self.save(&track, &link, &partial).await {
            Ok(bytes) => bytes,
            Err(e) => {
                discard_partial(&partial).await;
                return Err(e);
            }
        };
        if let Err(e) = fs_err::tokio::rename(&partial, &path).await {
            discard_partial(&partial).await;
            return Err(e.into());
        }

        Ok(TrackOutcome::Downloaded(DownloadedTrack { track, path, bytes }))
    }

    /// Downloads `link` into `partial` and tags it.
    async fn save(&self, track: &TrackDescriptor, link: &str, partial: &Path) -> AppResult<u64> {
        let service = self.resolver.service();
        let bytes = with_timeout(self.resolver.timeout(), "download", async {
            service
                .download_to(link, partial)
                .await
                .map_err(|e| AppError::Download(DownloadError::Transfer(format!("track {}: {}", track.id, e))))
        })
        .await?;

        if !partial.is_file() {
            return Err(DownloadError::FileNotFound(partial.display().to_string()).into());
        }

        tag_file(track, partial).await.map_err(|e| match e {
            AppError::Download(e) => AppError::Download(e),
            e => AppError::Download(DownloadError::Tagging(format!("track {}: {}", track.id, e))),
        })?;
        Ok(bytes)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

async fn discard_partial(partial: &Path) {
    match fs_err::tokio::remove_file(partial).await {
        Ok(()) => log::debug!("Removed incomplete {}", partial.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove incomplete download: {}", e),
    }
}

//! Delivery relay: forwards downloaded files or streaming links to a chat.
//!
//! Every send returns a `DeliveryOutcome` instead of an error so batch sends
//! keep going past a bad file. A relay whose transport failed to connect stays
//! usable as a value; all of its sends just fail.

use crate::core::config::Config;
use crate::core::error::{with_timeout, AppError};
use crate::core::types::{ChatTarget, Codec, DeliveryTarget, TransportMode, Window};
use crate::download::pipeline::BatchReport;
use crate::download::resolver::TrackResolver;
use crate::music::TrackDescriptor;
use crate::storage::library::LocalLibrary;
use crate::telegram::transport::{AudioTransport, LinkedAudio, TelegramTransport};
use secrecy::ExposeSecret;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a single send.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent)
    }
}

/// Per-item results of a batch send.
#[derive(Debug, Default)]
pub struct RelayReport {
    /// Items sent, in order (file names or track ids)
    pub sent: Vec<String>,
    /// Items that failed, with the reason
    pub failed: Vec<(String, String)>,
    pub cancelled: bool,
}

impl RelayReport {
    pub(crate) fn record(&mut self, item: String, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Sent => self.sent.push(item),
            DeliveryOutcome::Failed(reason) => self.failed.push((item, reason)),
        }
    }

    pub fn attempted(&self) -> usize {
        self.sent.len() + self.failed.len()
    }
}

/// Relays audio to Telegram.
pub struct DeliveryRelay {
    transport: Option<Arc<dyn AudioTransport>>,
    library: LocalLibrary,
    chat: ChatTarget,
    codec: Codec,
    timeout: Duration,
    cancel: CancellationToken,
}

impl DeliveryRelay {
    pub fn new(transport: Arc<dyn AudioTransport>, library: LocalLibrary, chat: ChatTarget, timeout: Duration) -> Self {
        Self {
            transport: Some(transport),
            library,
            chat,
            codec: Codec::Mp3,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// A relay without a working transport; every send fails.
    pub fn disconnected(library: LocalLibrary, chat: ChatTarget, timeout: Duration) -> Self {
        Self {
            transport: None,
            library,
            chat,
            codec: Codec::Mp3,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Connects the Telegram transport from `config`.
    ///
    /// A missing, malformed or rejected token is logged and yields a
    /// disconnected relay rather than an error.
    pub async fn from_config(config: &Config) -> Self {
        let library = LocalLibrary::new(config.library.root.clone());
        let chat = config.telegram.chat_id.clone();
        let timeout = config.network.timeout();
        let codec: Codec = config.download.codec.parse().unwrap_or_default();

        let token = match config.telegram.token.as_ref() {
            Some(token) => token.expose_secret().to_string(),
            None => {
                log::error!("Telegram token is not configured");
                return Self::disconnected(library, chat, timeout).with_codec(codec);
            }
        };

        match TelegramTransport::connect(&token, timeout).await {
            Ok(transport) => Self::new(Arc::new(transport), library, chat, timeout).with_codec(codec),
            Err(AppError::Config(reason)) => {
                log::error!("Invalid Telegram token: {}", reason);
                Self::disconnected(library, chat, timeout).with_codec(codec)
            }
            Err(e) => {
                log::error!("Telegram token rejected: {}", e);
                Self::disconnected(library, chat, timeout).with_codec(codec)
            }
        }
    }

    /// Codec whose files `send_all` picks up.
    #[must_use]
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.transport.is_some()
    }

    /// Default destination from config.
    pub fn chat(&self) -> &ChatTarget {
        &self.chat
    }

    fn transport(&self) -> Result<&Arc<dyn AudioTransport>, String> {
        self.transport
            .as_ref()
            .ok_or_else(|| "Telegram transport is not connected".to_string())
    }

    /// Uploads one file as an audio message.
    pub async fn send_file(&self, path: &Path, chat: &ChatTarget) -> DeliveryOutcome {
        let transport = match self.transport() {
            Ok(t) => t,
            Err(reason) => return self.fail(path.display(), reason),
        };
        if !path.is_file() {
            return self.fail(path.display(), "not a readable file".to_string());
        }

        let result = with_timeout(self.timeout, "send audio", transport.send_audio_file(chat, path)).await;
        match result {
            Ok(()) => {
                log::debug!("Track sent: {}", path.display());
                DeliveryOutcome::Sent
            }
            Err(e) => self.fail(path.display(), e.to_string()),
        }
    }

    /// Sends downloaded files from `directory` to the default chat, in name order.
    ///
    /// `count == 0` sends everything after `offset`. A failed file does not stop the batch.
    pub async fn send_all(&self, directory: &str, count: usize, offset: usize) -> RelayReport {
        let mut report = RelayReport::default();
        let dir = match self.library.directory_path(directory) {
            Some(dir) => dir,
            None => {
                log::error!("Bad library path: {:?}", directory);
                return report;
            }
        };

        let files = self.library.list_downloaded(directory, self.codec);
        let window = Window::new(offset, count);
        log::info!(
            "Sending {} of {} files from {} to {}",
            window.apply(&files).len(),
            files.len(),
            dir.display(),
            self.chat
        );

        for file in window.apply(&files) {
            if self.cancel.is_cancelled() {
                log::warn!("Send batch cancelled");
                report.cancelled = true;
                break;
            }
            let outcome = self.send_file(&dir.join(file), &self.chat).await;
            report.record(file.clone(), outcome);
        }
        report
    }

    /// Posts `track` as a playable link (mp3/192) with performer, title and cover.
    pub async fn send_link(&self, resolver: &TrackResolver, track: &TrackDescriptor, chat: &ChatTarget) -> DeliveryOutcome {
        let transport = match self.transport() {
            Ok(t) => t,
            Err(reason) => return self.fail(&track.id, reason),
        };

        let url = match resolver.streaming_link(track).await {
            Ok(url) => url,
            Err(e) => return self.fail(&track.id, format!("cannot resolve link: {}", e)),
        };
        let mut audio = LinkedAudio {
            url,
            performer: track.artist_line(),
            title: track.title.clone(),
            thumbnail: track.cover_url(),
        };

        let mut result = with_timeout(self.timeout, "send audio link", transport.send_audio_link(chat, &audio)).await;
        // Telegram may refuse a cover given by URL; the track itself still goes out
        match &result {
            Err(AppError::Timeout(..)) | Ok(()) => {}
            Err(e) if audio.thumbnail.is_some() => {
                log::warn!("Link send with cover failed for {}, retrying without: {}", track.id, e);
                audio.thumbnail = None;
                result = with_timeout(self.timeout, "send audio link", transport.send_audio_link(chat, &audio)).await;
            }
            Err(_) => {}
        }

        match result {
            Ok(()) => {
                log::debug!("Track link sent: {} - {}", audio.performer, audio.title);
                DeliveryOutcome::Sent
            }
            Err(e) => self.fail(&track.id, e.to_string()),
        }
    }

    /// Relays what a download batch produced, by file or by link per `target.mode`.
    pub async fn deliver(&self, batch: &BatchReport, resolver: &TrackResolver, target: &DeliveryTarget) -> RelayReport {
        let mut report = RelayReport::default();
        for done in &batch.downloaded {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let (item, outcome) = match target.mode {
                TransportMode::File => (
                    file_label(&done.path),
                    self.send_file(&done.path, &target.chat).await,
                ),
                TransportMode::Link => (
                    done.track.id.to_string(),
                    self.send_link(resolver, &done.track, &target.chat).await,
                ),
            };
            report.record(item, outcome);
        }
        report
    }

    fn fail(&self, item: impl std::fmt::Display, reason: String) -> DeliveryOutcome {
        log::error!("Failed to send audio {}: {}", item, reason);
        DeliveryOutcome::Failed(reason)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

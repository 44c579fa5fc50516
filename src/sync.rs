//! `LikesSync` wires resolver, orchestrator and relay together from one `Config`.

use crate::core::config::Config;
use crate::core::error::AppResult;
use crate::core::types::{DeliveryTarget, Window};
use crate::download::pipeline::{BatchReport, DownloadOrchestrator, DownloadRequest};
use crate::download::resolver::{TrackList, TrackQuery, TrackResolver};
use crate::music::{MusicService, YandexMusicClient};
use crate::storage::library::LocalLibrary;
use crate::telegram::relay::{DeliveryRelay, RelayReport};
use crate::telegram::transport::AudioTransport;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct LikesSync {
    resolver: Arc<TrackResolver>,
    orchestrator: DownloadOrchestrator,
    relay: DeliveryRelay,
    target: DeliveryTarget,
    cancel: CancellationToken,
}

impl LikesSync {
    /// Builds every component from `config`. Nothing is authenticated yet,
    /// except the Telegram transport, which checks its token on construction.
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let timeout = config.network.timeout();
        let service = YandexMusicClient::new(config.music.token.clone(), &config.music.api_url, timeout)?;
        let relay = DeliveryRelay::from_config(config).await;

        Ok(Self::assemble(
            Arc::new(service),
            relay,
            LocalLibrary::new(config.library.root.clone()),
            config.telegram.target(),
            timeout,
        ))
    }

    /// Builds from explicit parts. `transport: None` gives a relay that cannot send.
    pub fn with_parts(
        service: Arc<dyn MusicService>,
        transport: Option<Arc<dyn AudioTransport>>,
        library: LocalLibrary,
        target: DeliveryTarget,
        timeout: Duration,
    ) -> Self {
        let relay = match transport {
            Some(transport) => DeliveryRelay::new(transport, library.clone(), target.chat.clone(), timeout),
            None => DeliveryRelay::disconnected(library.clone(), target.chat.clone(), timeout),
        };
        Self::assemble(service, relay, library, target, timeout)
    }

    fn assemble(
        service: Arc<dyn MusicService>,
        relay: DeliveryRelay,
        library: LocalLibrary,
        target: DeliveryTarget,
        timeout: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let resolver = Arc::new(TrackResolver::new(service, timeout));
        let orchestrator = DownloadOrchestrator::new(resolver.clone(), library).with_cancellation(cancel.clone());

        Self {
            resolver,
            orchestrator,
            relay: relay.with_cancellation(cancel.clone()),
            target,
            cancel,
        }
    }

    /// Token that stops download and send loops before their next item.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn resolver(&self) -> &TrackResolver {
        &self.resolver
    }

    /// Destination from config.
    pub fn target(&self) -> &DeliveryTarget {
        &self.target
    }

    pub fn relay(&self) -> &DeliveryRelay {
        &self.relay
    }

    /// Authenticates with the music service. Failure is logged, not returned.
    pub async fn connect(&self) -> bool {
        match self.resolver.connect().await {
            Ok(account) => {
                log::info!("Authorized as uid {}", account.uid);
                true
            }
            Err(_) => false,
        }
    }

    /// Resolves `query`; errors are logged and yield an empty list.
    pub async fn resolve(&self, query: &TrackQuery, window: Window) -> TrackList {
        match self.resolver.resolve(query, window).await {
            Ok(list) => list,
            Err(e) => {
                log::error!("Failed to resolve tracks: {}", e);
                TrackList::default()
            }
        }
    }

    /// Resolves `query` in full and downloads it with `request`'s window.
    pub async fn sync(&self, query: &TrackQuery, request: &DownloadRequest) -> BatchReport {
        // Windowing happens once, in the orchestrator
        let tracks = match self.resolver.resolve(query, Window::all()).await {
            Ok(list) => list,
            Err(e) => {
                log::error!("Failed to resolve tracks: {}", e);
                return BatchReport::aborted(e.to_string());
            }
        };
        self.orchestrator.download(tracks, request).await
    }

    pub async fn download(&self, tracks: TrackList, request: &DownloadRequest) -> BatchReport {
        self.orchestrator.download(tracks, request).await
    }

    /// Relays a batch's results to `target`, by file or by link per its mode.
    pub async fn deliver(&self, batch: &BatchReport, target: &DeliveryTarget) -> RelayReport {
        self.relay.deliver(batch, &self.resolver, target).await
    }

    pub async fn send_all(&self, directory: &str, count: usize, offset: usize) -> RelayReport {
        self.relay.send_all(directory, count, offset).await
    }

    /// Posts each resolved track of `query` as a link to the configured chat.
    pub async fn send_links(&self, query: &TrackQuery, window: Window) -> RelayReport {
        let mut report = RelayReport::default();
        for entry in self.resolve(query, window).await {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let id = entry.id().to_string();
            let outcome = match self.resolver.fetch(entry).await {
                Ok(track) => self.relay.send_link(&self.resolver, &track, &self.target.chat).await,
                Err(e) => {
                    log::error!("Track {} failed: {}", id, e);
                    crate::telegram::relay::DeliveryOutcome::Failed(e.to_string())
                }
            };
            report.record(id, outcome);
        }
        report
    }
}

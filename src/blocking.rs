//! Synchronous front end over [`LikesSync`] for callers without a runtime.
//!
//! Each call blocks the current thread on a private current-thread runtime.
//! Must not be used from inside another tokio runtime.

use crate::core::config::Config;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{DeliveryTarget, Window};
use crate::download::pipeline::{BatchReport, DownloadRequest};
use crate::download::resolver::TrackQuery;
use crate::sync::LikesSync;
use crate::telegram::relay::RelayReport;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

pub struct BlockingSync {
    runtime: Runtime,
    inner: LikesSync,
}

fn current_thread_runtime() -> AppResult<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(AppError::from)
}

impl BlockingSync {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let runtime = current_thread_runtime()?;
        let inner = runtime.block_on(LikesSync::from_config(config))?;
        Ok(Self { runtime, inner })
    }

    /// Wraps an already built `LikesSync`.
    pub fn new(inner: LikesSync) -> AppResult<Self> {
        Ok(Self {
            runtime: current_thread_runtime()?,
            inner,
        })
    }

    pub fn inner(&self) -> &LikesSync {
        &self.inner
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.inner.cancel_token()
    }

    pub fn connect(&self) -> bool {
        self.runtime.block_on(self.inner.connect())
    }

    pub fn sync(&self, query: &TrackQuery, request: &DownloadRequest) -> BatchReport {
        self.runtime.block_on(self.inner.sync(query, request))
    }

    pub fn deliver(&self, batch: &BatchReport, target: &DeliveryTarget) -> RelayReport {
        self.runtime.block_on(self.inner.deliver(batch, target))
    }

    pub fn send_all(&self, directory: &str, count: usize, offset: usize) -> RelayReport {
        self.runtime.block_on(self.inner.send_all(directory, count, offset))
    }

    pub fn send_links(&self, query: &TrackQuery, window: Window) -> RelayReport {
        self.runtime.block_on(self.inner.send_links(query, window))
    }
}

//! Runtime configuration.
//!
//! Assembled by figment from defaults, an optional TOML file and `LIKESYNC_*`
//! environment variables (nested keys separated by `__`, e.g.
//! `LIKESYNC_TELEGRAM__CHAT_ID`). The resulting [`Config`] is handed to
//! component constructors; nothing reads it from a global.

use crate::core::error::{AppError, AppResult};
use crate::core::types::{ChatTarget, DeliveryTarget, TransportMode};
use crate::download::DownloadRequest;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up when `LIKESYNC_CONFIG` is not set
pub const DEFAULT_CONFIG_FILE: &str = "likesync.toml";

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "LIKESYNC_";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub music: MusicConfig,
    pub telegram: TelegramConfig,
    pub library: LibraryConfig,
    pub download: DownloadDefaults,
    pub network: NetworkConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// OAuth token for api.music.yandex.net
    pub token: Option<SecretString>,
    pub api_url: String,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.music.yandex.net".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub token: Option<SecretString>,
    pub chat_id: ChatTarget,
    pub mode: TransportMode,
}

impl TelegramConfig {
    pub fn target(&self) -> DeliveryTarget {
        DeliveryTarget {
            chat: self.chat_id.clone(),
            mode: self.mode,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Working root; track directories are created directly under it
    pub root: PathBuf,
    /// Default directory name (sanitized before use)
    pub directory: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            directory: "tracks".to_string(),
        }
    }
}

/// Defaults for a download batch. Kept as raw values: they are validated
/// per batch, so a bad codec here aborts the batch, not the process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadDefaults {
    pub codec: String,
    pub bitrate: u32,
    pub count: usize,
    pub offset: usize,
    pub allow_duplicates: bool,
}

impl Default for DownloadDefaults {
    fn default() -> Self {
        Self {
            codec: "mp3".to_string(),
            bitrate: 192,
            count: 10,
            offset: 0,
            allow_duplicates: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-call timeout for every network operation (in seconds)
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: String,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: "likesync.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads defaults, then `path` (or `$LIKESYNC_CONFIG`, or `likesync.toml`) if it exists,
    /// then `LIKESYNC_*` environment overrides.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var("LIKESYNC_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };
        if path.exists() {
            log::debug!("Reading config from {}", path.display());
        }

        Self::extract(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    /// Parses a TOML document on top of the defaults (no environment overrides).
    pub fn from_toml_str(toml: &str) -> AppResult<Self> {
        Self::extract(Figment::from(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> AppResult<Self> {
        figment
            .extract::<Config>()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Download request built from the configured defaults.
    pub fn download_request(&self) -> DownloadRequest {
        DownloadRequest {
            directory: self.library.directory.clone(),
            codec: self.download.codec.clone(),
            bitrate: self.download.bitrate,
            count: self.download.count,
            offset: self.download.offset,
            allow_duplicates: self.download.allow_duplicates,
        }
    }
}

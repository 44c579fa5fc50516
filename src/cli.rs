use crate::core::types::TransportMode;
use crate::download::pipeline::DownloadRequest;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "likesync")]
#[command(author, version, about = "Download Yandex Music liked tracks and relay them to Telegram", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file (defaults to $LIKESYNC_CONFIG or likesync.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download liked tracks (or the given ids) into the library
    Download {
        #[command(flatten)]
        args: DownloadArgs,
    },

    /// Send downloaded files from a library directory to the chat
    SendAll {
        /// Directory under the library root
        #[arg(short, long)]
        directory: Option<String>,

        /// Number of files to send (0 = all)
        #[arg(short = 'n', long, default_value_t = 0)]
        count: usize,

        /// Files to skip from the start
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Post tracks to the chat as streaming links
    SendLink {
        /// Track ids (`track` or `album:track`)
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Download, then deliver what was downloaded
    Sync {
        #[command(flatten)]
        args: DownloadArgs,

        /// Delivery mode (overrides telegram.mode)
        #[arg(long)]
        mode: Option<TransportMode>,
    },
}

/// Batch options; anything left unset comes from the `[download]` config section.
#[derive(Args, Debug, Default)]
pub struct DownloadArgs {
    /// Explicit track ids instead of the liked list
    #[arg(long, num_args = 1..)]
    pub ids: Vec<String>,

    /// Directory under the library root
    #[arg(short, long)]
    pub directory: Option<String>,

    /// Codec: mp3 or aac
    #[arg(long)]
    pub codec: Option<String>,

    /// Bitrate in kbps: 64, 128, 192 or 320
    #[arg(short, long)]
    pub bitrate: Option<u32>,

    /// Tracks to download (0 = no limit)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Tracks to skip from the start of the list
    #[arg(long)]
    pub offset: Option<usize>,

    /// Download even if the file already exists
    #[arg(long)]
    pub allow_duplicates: bool,
}

impl DownloadArgs {
    /// Overlays the flags that were given onto `base`.
    pub fn apply(&self, base: DownloadRequest) -> DownloadRequest {
        DownloadRequest {
            directory: self.directory.clone().unwrap_or(base.directory),
            codec: self.codec.clone().unwrap_or(base.codec),
            bitrate: self.bitrate.unwrap_or(base.bitrate),
            count: self.count.unwrap_or(base.count),
            offset: self.offset.unwrap_or(base.offset),
            allow_duplicates: self.allow_duplicates || base.allow_duplicates,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

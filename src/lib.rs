//! likesync - sync Yandex Music liked tracks to disk and to a Telegram chat
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging and shared types
//! - `music`: music service abstraction and the Yandex Music client
//! - `storage`: the local track library
//! - `download`: track resolution, downloading and ID3 tagging
//! - `telegram`: delivery of files and links to a chat

pub mod blocking;
pub mod cli;
pub mod core;
pub mod download;
pub mod music;
pub mod storage;
pub mod sync;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult, Config};
pub use download::{BatchReport, DownloadRequest, TrackQuery};
pub use sync::LikesSync;
pub use telegram::{DeliveryOutcome, RelayReport};

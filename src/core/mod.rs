//! Core utilities, configuration, and common functionality

pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use error::{with_timeout, AppError, AppResult};
pub use logging::init_logger;
pub use types::{Bitrate, ChatTarget, Codec, DeliveryTarget, TransportMode, Window};

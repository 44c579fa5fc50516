//! Logger initialization (console + file)

use crate::core::error::{AppError, AppResult};
use simplelog::*;
use std::fs::File;

/// Parses a level name from config; unknown names fall back to `Info`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
/// * `level` - Level name from config (`info`, `debug`, ...)
pub fn init_logger(log_file_path: &str, level: &str) -> AppResult<()> {
    let level = parse_level(level);
    let log_file = File::create(log_file_path)
        .map_err(|e| AppError::Config(format!("Failed to create log file {}: {}", log_file_path, e)))?;

    let config = ConfigBuilder::new()
        .add_filter_allow_str("likesync")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(level, config.clone(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, config, log_file),
    ])
    .map_err(|e| AppError::Config(format!("Failed to initialize logger: {}", e)))?;

    Ok(())
}

use anyhow::{bail, Result};
use dotenvy::dotenv;
use tokio::signal;

use likesync::cli::{Cli, Commands, DownloadArgs};
use likesync::core::types::{DeliveryTarget, Window};
use likesync::core::{init_logger, Config};
use likesync::download::{BatchReport, TrackQuery};
use likesync::telegram::RelayReport;
use likesync::LikesSync;

/// Parses CLI arguments, loads config and dispatches to the subcommand.
///
/// # Errors
/// Returns an error if config or logging setup fails, if the music service
/// rejects the token, or if a download batch is aborted.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let config = Config::load(cli.config.as_deref())?;
    init_logger(&config.log.file, &config.log.level)?;

    let app = LikesSync::from_config(&config).await?;

    // Ctrl-C stops the running batch before its next item
    let cancel = app.cancel_token();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping after the current item");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::Download { args } => {
            let report = run_download(&app, &config, &args).await?;
            log_batch(&report);
            Ok(())
        }
        Commands::SendAll {
            directory,
            count,
            offset,
        } => {
            let directory = directory.unwrap_or_else(|| config.library.directory.clone());
            let report = app.send_all(&directory, count, offset).await;
            log_relay(&report);
            Ok(())
        }
        Commands::SendLink { ids } => {
            connect(&app).await?;
            let report = app.send_links(&TrackQuery::from_ids(ids), Window::all()).await;
            log_relay(&report);
            Ok(())
        }
        Commands::Sync { args, mode } => {
            let report = run_download(&app, &config, &args).await?;
            log_batch(&report);

            let target = DeliveryTarget {
                chat: app.target().chat.clone(),
                mode: mode.unwrap_or(app.target().mode),
            };
            let relayed = app.deliver(&report, &target).await;
            log_relay(&relayed);
            Ok(())
        }
    }
}

async fn connect(app: &LikesSync) -> Result<()> {
    if !app.connect().await {
        bail!("Yandex Music authentication failed, check music.token");
    }
    Ok(())
}

async fn run_download(app: &LikesSync, config: &Config, args: &DownloadArgs) -> Result<BatchReport> {
    connect(app).await?;

    let query = TrackQuery::from_ids(args.ids.iter().cloned());
    let request = args.apply(config.download_request());
    let report = app.sync(&query, &request).await;

    if let Some(reason) = &report.aborted {
        bail!("Download aborted: {}", reason);
    }
    Ok(report)
}

fn log_batch(report: &BatchReport) {
    log::info!(
        "Downloaded {}, skipped {}, failed {}{}",
        report.downloaded.len(),
        report.skipped.len(),
        report.failed.len(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
    for (id, reason) in &report.failed {
        log::warn!("  {}: {}", id, reason);
    }
}

fn log_relay(report: &RelayReport) {
    log::info!(
        "Sent {} of {}{}",
        report.sent.len(),
        report.attempted(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
    for (item, reason) in &report.failed {
        log::warn!("  {}: {}", item, reason);
    }
}

use crate::config_loader::{self, DEFAULT_CONFIG_DIR};
use crate::core::batch_runner::{BatchRunner, BatchSummary, RunMode};
use crate::core::device_client::DeviceConnector;
use crate::download::downloader::RecordingDownloader;
use crate::hub_config::HubConfig;
use anyhow::Result;
use clap::ArgMatches;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

pub fn config_dir_from_args(args: &ArgMatches) -> PathBuf {
    let dir = args
        .get_one::<String>("config-dir")
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_CONFIG_DIR);
    PathBuf::from(dir)
}

/// Loads every hub configuration named by the CLI arguments.
pub fn load_hub_configs(args: &ArgMatches) -> Result<Vec<HubConfig>> {
    let config_dir = config_dir_from_args(args);
    debug!("Loading hub configurations from '{}'", config_dir.display());
    let configs: Vec<HubConfig> = config_loader::load_all(&config_dir)?
        .into_iter()
        .map(|(path, config)| {
            debug!("  {} -> hub '{}'", path.display(), config.host);
            config
        })
        .collect();
    if configs.is_empty() {
        warn!("⚠️ No *.json hub configurations found in '{}'.", config_dir.display());
    }
    Ok(configs)
}

/// Runs the batch over every hub with stdout as the console.
pub async fn run_batch(
    operation_display_name: &str,
    configs: Vec<HubConfig>,
    connector: &dyn DeviceConnector,
    downloader: &dyn RecordingDownloader,
    mode: RunMode,
) -> Result<BatchSummary> {
    let op_start_time = Instant::now();
    info!("🛠️ Starting '{}' over {} hub(s)...", operation_display_name, configs.len());
    let mut runner = BatchRunner::new(connector, downloader, std::io::stdout(), mode);
    let summary = runner.run(configs).await?;
    info!(
        "🏁 '{}' finished in {:?}: {} hub(s), {} camera(s), {} unsupported, {} recording(s) found, {} downloaded, {} skipped.",
        operation_display_name,
        op_start_time.elapsed(),
        summary.hubs,
        summary.cameras,
        summary.unsupported,
        summary.recordings_found,
        summary.downloaded,
        summary.skipped
    );
    Ok(summary)
}

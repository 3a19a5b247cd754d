use crate::core::batch_runner::RunMode;
use crate::device::tapo_client::TapoConnector;
use crate::download::converter::FfmpegConverter;
use crate::download::downloader::StreamDownloader;
use crate::operations::op_helper;
use anyhow::Result;
use clap::ArgMatches;
use log::debug;

pub async fn handle_download_cli(global_args: &ArgMatches) -> Result<()> {
    let configs = op_helper::load_hub_configs(global_args)?;
    let ffmpeg_path = global_args
        .get_one::<String>("ffmpeg")
        .cloned()
        .unwrap_or_else(|| "ffmpeg".to_string());
    debug!("Using converter binary '{}'", ffmpeg_path);

    let connector = TapoConnector;
    let downloader = StreamDownloader::new(Box::new(FfmpegConverter::new(ffmpeg_path)));
    op_helper::run_batch("Recording Download", configs, &connector, &downloader, RunMode::Download).await?;
    Ok(())
}

use crate::core::batch_runner::RunMode;
use crate::device::tapo_client::TapoConnector;
use crate::download::converter::FfmpegConverter;
use crate::download::downloader::StreamDownloader;
use crate::operations::op_helper;
use anyhow::Result;
use clap::ArgMatches;

pub async fn handle_list_cli(global_args: &ArgMatches) -> Result<()> {
    let configs = op_helper::load_hub_configs(global_args)?;
    let connector = TapoConnector;
    // Never invoked in list mode.
    let downloader = StreamDownloader::new(Box::new(FfmpegConverter::new("ffmpeg")));
    op_helper::run_batch("Recording Listing", configs, &connector, &downloader, RunMode::List).await?;
    Ok(())
}

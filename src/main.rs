use anyhow::{bail, Result};
use hubrec::common::logging_setup;
use hubrec::{cli, operations};
use log::{debug, error, info};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let main_start_time = Instant::now();
    let matches = cli::build_cli().get_matches();

    // Global options propagate into the subcommand matches; without one, run the download.
    let (operation_name, op_args) = match matches.subcommand() {
        Some((name, sub_matches)) => (name, sub_matches),
        None => ("download", &matches),
    };
    logging_setup::initialize_logging(op_args);
    debug!("🎬 Dispatching to operation: {}", operation_name);
    let op_start_time = Instant::now();

    let op_result: Result<()> = match operation_name {
        "download" => operations::download_op::handle_download_cli(op_args).await,
        "list" => operations::list_op::handle_list_cli(op_args).await,
        other => bail!("Subcommand '{}' not implemented.", other),
    };

    if let Err(e) = op_result {
        error!("❌ Operation '{}' failed after {:?}: {:#}", operation_name, op_start_time.elapsed(), e);
        return Err(e);
    }
    info!("🏁 hubrec finished in {:?}.", main_start_time.elapsed());
    Ok(())
}

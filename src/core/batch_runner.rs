use crate::common::file_utils::ensure_output_directory;
use crate::common::timestamp_utils::{format_date_label, recording_file_name};
use crate::core::device_client::{DeviceClient, DeviceConnector};
use crate::download::downloader::{DownloadJob, DownloadOutcome, DownloadStatus, RecordingDownloader};
use crate::download::progress::ProgressPrinter;
use crate::hub_config::HubConfig;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io::Write;
use std::time::Instant;

/// Camera models whose recordings can be fetched through the hub.
pub const SUPPORTED_MODELS: [&str; 2] = ["C400", "C420"];

pub fn is_supported_model(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Download,
    /// Enumerate recordings without fetching them.
    List,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub hubs: usize,
    pub cameras: usize,
    pub unsupported: usize,
    pub recordings_found: usize,
    pub downloaded: usize,
    pub skipped: usize,
}

/// Walks hubs, cameras, dates and recordings one at a time.
///
/// Any failure ends the whole batch; there is no per-item recovery.
pub struct BatchRunner<'a, W: Write + Send> {
    connector: &'a dyn DeviceConnector,
    downloader: &'a dyn RecordingDownloader,
    out: W,
    mode: RunMode,
}

impl<'a, W: Write + Send> BatchRunner<'a, W> {
    pub fn new(
        connector: &'a dyn DeviceConnector,
        downloader: &'a dyn RecordingDownloader,
        out: W,
        mode: RunMode,
    ) -> Self {
        Self {
            connector,
            downloader,
            out,
            mode,
        }
    }

    pub async fn run(&mut self, configs: Vec<HubConfig>) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let mut summary = BatchSummary::default();
        for config in configs {
            let hub_start = Instant::now();
            let host = config.host.clone();
            self.run_hub(config, &mut summary).await?;
            summary.hubs += 1;
            info!("✅ Hub '{}' done in {:?}.", host, hub_start.elapsed());
        }
        info!("🏁 Batch finished in {:?}: {:?}", start_time.elapsed(), summary);
        Ok(summary)
    }

    async fn run_hub(&mut self, mut config: HubConfig, summary: &mut BatchSummary) -> Result<()> {
        writeln!(self.out, "Connecting to Hub...")?;
        let hub = self.connector.connect_hub(&config).await?;

        let children = hub
            .get_child_devices()
            .await
            .with_context(|| format!("Failed to list child devices of hub '{}'", config.host))?;
        debug!("Hub '{}' reports {} child device(s).", config.host, children.len());

        for child in children {
            if !is_supported_model(&child.device_model) {
                writeln!(self.out, "{} is not supported.", child.device_model)?;
                summary.unsupported += 1;
                continue;
            }
            writeln!(self.out, "{} : {}", child.alias, child.device_id)?;

            let camera = self.connector.connect_child(&config, &child).await?;
            let output_dir = config.set_output_directory(&child.alias);
            if self.mode == RunMode::Download {
                ensure_output_directory(&output_dir)?;
            }
            summary.cameras += 1;
            self.run_camera(camera.as_ref(), &config, summary).await?;
        }
        Ok(())
    }

    async fn run_camera(
        &mut self,
        camera: &dyn DeviceClient,
        config: &HubConfig,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        writeln!(self.out, "Getting recordings...")?;
        let dates = camera
            .get_recording_dates()
            .await
            .with_context(|| format!("Failed to list recording dates for '{}'", camera.get_name()))?;
        if dates.is_empty() {
            warn!("⚠️ No recordings found on '{}'.", camera.get_name());
        }

        let Some(output_dir) = config.output_dir.clone() else {
            anyhow::bail!("Output directory not set for '{}'", camera.get_name());
        };

        for date in dates {
            let recordings = camera
                .get_recordings(&date)
                .await
                .with_context(|| format!("Failed to list recordings of {} for '{}'", date, camera.get_name()))?;
            debug!("{} recording(s) on {} for '{}'.", recordings.len(), date, camera.get_name());
            summary.recordings_found += recordings.len();

            for recording in recordings {
                let file_name = recording_file_name(recording.start_time)?;
                if self.mode == RunMode::List {
                    writeln!(
                        self.out,
                        "{} {} ({}s)",
                        format_date_label(&date),
                        file_name,
                        recording.duration_secs()
                    )?;
                    continue;
                }

                let job = DownloadJob {
                    recording,
                    output_dir: output_dir.clone(),
                    file_name,
                    window_size: config.window_size,
                    overwrite: config.overwrite_files,
                };
                let mut printer = ProgressPrinter::new(&mut self.out);
                let mut progress_broken = false;
                let outcome = self
                    .downloader
                    .download(camera, &job, &mut |status: &DownloadStatus| {
                        if progress_broken {
                            return;
                        }
                        if let Err(e) = printer.update(status) {
                            warn!("⚠️ Progress output failed, continuing without it: {}", e);
                            progress_broken = true;
                        }
                    })
                    .await?;
                printer.finish()?;

                match outcome {
                    DownloadOutcome::Downloaded(_) => summary.downloaded += 1,
                    DownloadOutcome::Skipped(_) => summary.skipped += 1,
                }
            }
        }
        Ok(())
    }
}

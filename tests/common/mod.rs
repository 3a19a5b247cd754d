// Shared test doubles for the device-client seam.
#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use hubrec::core::device_client::{
    ChildDevice, DeviceClient, DeviceConnector, PlaybackChunk, PlaybackStream, Recording,
};
use hubrec::download::downloader::{DownloadJob, DownloadOutcome, DownloadStatus, RecordingDownloader, ReportFn};
use hubrec::hub_config::HubConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn child(device_id: &str, alias: &str, model: &str) -> ChildDevice {
    ChildDevice {
        device_id: device_id.to_string(),
        alias: alias.to_string(),
        device_model: model.to_string(),
    }
}

pub fn hub_config(host: &str, output_root: &std::path::Path) -> HubConfig {
    HubConfig {
        host: host.to_string(),
        cloud_password: "pw".to_string(),
        output_root_dir: output_root.to_string_lossy().to_string(),
        ..HubConfig::default()
    }
}

/// Everything a fake hub knows: its children and each camera's recordings by date.
#[derive(Default, Clone)]
pub struct FakeHub {
    pub children: Vec<ChildDevice>,
    pub recordings: HashMap<String, Vec<(String, Vec<Recording>)>>, // device_id -> [(date, recordings)]
}

pub struct FakeClient {
    name: String,
    children: Vec<ChildDevice>,
    recordings: Vec<(String, Vec<Recording>)>,
}

#[async_trait]
impl DeviceClient for FakeClient {
    fn get_name(&self) -> String {
        self.name.clone()
    }

    async fn get_child_devices(&self) -> Result<Vec<ChildDevice>> {
        Ok(self.children.clone())
    }

    async fn get_recording_dates(&self) -> Result<Vec<String>> {
        Ok(self.recordings.iter().map(|(d, _)| d.clone()).collect())
    }

    async fn get_recordings(&self, date: &str) -> Result<Vec<Recording>> {
        Ok(self
            .recordings
            .iter()
            .find(|(d, _)| d == date)
            .map(|(_, r)| r.clone())
            .unwrap_or_default())
    }

    async fn open_playback(&self, _recording: &Recording, _window_size: u32) -> Result<Box<dyn PlaybackStream>> {
        Ok(Box::new(EmptyStream))
    }
}

struct EmptyStream;

#[async_trait]
impl PlaybackStream for EmptyStream {
    async fn next_chunk(&mut self) -> Result<Option<PlaybackChunk>> {
        Ok(None)
    }
}

/// Connector backed by `FakeHub`s keyed by host; logs every connection it makes.
#[derive(Default)]
pub struct FakeConnector {
    pub hubs: HashMap<String, FakeHub>,
    pub connections: Mutex<Vec<String>>,
}

#[async_trait]
impl DeviceConnector for FakeConnector {
    async fn connect_hub(&self, config: &HubConfig) -> Result<Box<dyn DeviceClient>> {
        self.connections.lock().unwrap().push(format!("hub:{}", config.host));
        let Some(hub) = self.hubs.get(&config.host) else {
            bail!("hub '{}' unreachable", config.host);
        };
        Ok(Box::new(FakeClient {
            name: config.host.clone(),
            children: hub.children.clone(),
            recordings: Vec::new(),
        }))
    }

    async fn connect_child(&self, config: &HubConfig, child: &ChildDevice) -> Result<Box<dyn DeviceClient>> {
        self.connections
            .lock()
            .unwrap()
            .push(format!("child:{}:{}", config.host, child.device_id));
        let recordings = self
            .hubs
            .get(&config.host)
            .and_then(|h| h.recordings.get(&child.device_id))
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(FakeClient {
            name: child.alias.clone(),
            children: Vec::new(),
            recordings,
        }))
    }
}

/// Downloader that records each job and writes a placeholder file.
#[derive(Default, Clone)]
pub struct RecordingJobs {
    pub jobs: Arc<Mutex<Vec<DownloadJob>>>,
    pub fail_on: Option<String>,
}

#[async_trait]
impl RecordingDownloader for RecordingJobs {
    async fn download(
        &self,
        _client: &dyn DeviceClient,
        job: &DownloadJob,
        report: &mut ReportFn<'_>,
    ) -> Result<DownloadOutcome> {
        if self.fail_on.as_deref() == Some(job.file_name.as_str()) {
            bail!("stream broke for {}", job.file_name);
        }
        self.jobs.lock().unwrap().push(job.clone());
        let target = job.target_path();
        if target.exists() && !job.overwrite {
            return Ok(DownloadOutcome::Skipped(target));
        }
        let total = job.recording.duration_secs() as f64;
        for (action, progress) in [("Downloading", 1.0), ("Finished download", total)] {
            report(&DownloadStatus {
                current_action: action.to_string(),
                file_name: job.file_name.clone(),
                progress,
                total,
            });
        }
        std::fs::write(&target, b"video")?;
        Ok(DownloadOutcome::Downloaded(target))
    }
}

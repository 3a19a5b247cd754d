use crate::hub_config::HubConfig;
use anyhow::Result;
use async_trait::async_trait;

// --- Data returned by a hub or child camera ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDevice {
    pub device_id: String,
    pub alias: String,
    pub device_model: String,
}

/// One time-bounded segment, start and end as Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recording {
    pub start_time: i64,
    pub end_time: i64,
}

impl Recording {
    pub fn duration_secs(&self) -> i64 {
        (self.end_time - self.start_time).max(0)
    }
}

// A slice of MPEG-TS payload received from a playback session.
#[derive(Debug, Clone)]
pub struct PlaybackChunk {
    pub data: Vec<u8>,
}

// --- The device-client seam ---

#[async_trait]
pub trait PlaybackStream: Send {
    /// Next chunk of the stream, `None` once the device signals the end.
    async fn next_chunk(&mut self) -> Result<Option<PlaybackChunk>>;
}

#[async_trait]
pub trait DeviceClient: Send + Sync {
    fn get_name(&self) -> String;

    async fn get_child_devices(&self) -> Result<Vec<ChildDevice>>;

    /// Dates that hold at least one recording, device formatted (`YYYYMMDD`).
    async fn get_recording_dates(&self) -> Result<Vec<String>>;

    async fn get_recordings(&self, date: &str) -> Result<Vec<Recording>>;

    async fn open_playback(
        &self,
        recording: &Recording,
        window_size: u32,
    ) -> Result<Box<dyn PlaybackStream>>;
}

/// Opens authenticated clients for a hub and for the cameras behind it.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect_hub(&self, config: &HubConfig) -> Result<Box<dyn DeviceClient>>;

    async fn connect_child(
        &self,
        config: &HubConfig,
        child: &ChildDevice,
    ) -> Result<Box<dyn DeviceClient>>;
}

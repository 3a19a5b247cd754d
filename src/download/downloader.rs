use crate::common::file_utils::intermediate_path;
use crate::core::device_client::{DeviceClient, Recording};
use crate::download::converter::MediaConverter;
use crate::download::ts_clock::TsClock;
use crate::errors::AppError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

pub const ACTION_SKIPPING: &str = "Skipping download, file exists";
pub const ACTION_DOWNLOADING: &str = "Downloading";
pub const ACTION_CONVERTING: &str = "Converting";
pub const ACTION_FINISHED: &str = "Finished download";

/// Progress update emitted while a recording is fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadStatus {
    pub current_action: String,
    pub file_name: String,
    pub progress: f64, // seconds of stream received
    pub total: f64,    // recording length in seconds
}

#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub recording: Recording,
    pub output_dir: PathBuf,
    pub file_name: String,
    pub window_size: u32,
    pub overwrite: bool,
}

impl DownloadJob {
    pub fn target_path(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    Skipped(PathBuf),
}

/// Progress callback handed to a downloader.
pub type ReportFn<'a> = dyn for<'s> FnMut(&'s DownloadStatus) + Send + 'a;

#[async_trait]
pub trait RecordingDownloader: Send + Sync {
    async fn download(
        &self,
        client: &dyn DeviceClient,
        job: &DownloadJob,
        report: &mut ReportFn<'_>,
    ) -> Result<DownloadOutcome>;
}

/// Pulls a recording through a playback session into a `.ts` file, then converts it.
pub struct StreamDownloader {
    converter: Box<dyn MediaConverter>,
}

impl StreamDownloader {
    pub fn new(converter: Box<dyn MediaConverter>) -> Self {
        Self { converter }
    }

    async fn fetch_stream(
        &self,
        client: &dyn DeviceClient,
        job: &DownloadJob,
        ts_path: &Path,
        report: &mut ReportFn<'_>,
    ) -> Result<u64> {
        let total = job.recording.duration_secs() as f64;
        let mut stream = client
            .open_playback(&job.recording, job.window_size)
            .await
            .with_context(|| format!("Failed to start playback for '{}'", job.file_name))?;

        let file = File::create(ts_path)
            .await
            .map_err(|e| AppError::Io(format!("Failed to create '{}': {}", ts_path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        let mut clock = TsClock::new();
        let mut bytes_written: u64 = 0;

        while let Some(chunk) = stream.next_chunk().await? {
            writer
                .write_all(&chunk.data)
                .await
                .map_err(|e| AppError::Io(format!("Failed to write '{}': {}", ts_path.display(), e)))?;
            bytes_written += chunk.data.len() as u64;
            let progress = clock.feed(&chunk.data).min(total);
            report(&status(ACTION_DOWNLOADING, &job.file_name, progress, total));
        }
        writer.flush().await.map_err(AppError::from)?;
        Ok(bytes_written)
    }
}

fn status(action: &str, file_name: &str, progress: f64, total: f64) -> DownloadStatus {
    DownloadStatus {
        current_action: action.to_string(),
        file_name: file_name.to_string(),
        progress,
        total,
    }
}

async fn remove_partial(ts_path: &Path) {
    match tokio::fs::remove_file(ts_path).await {
        Ok(()) => debug!("Removed partial file '{}'", ts_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial file '{}': {}", ts_path.display(), e),
    }
}

#[async_trait]
impl RecordingDownloader for StreamDownloader {
    async fn download(
        &self,
        client: &dyn DeviceClient,
        job: &DownloadJob,
        report: &mut ReportFn<'_>,
    ) -> Result<DownloadOutcome> {
        let start_time = Instant::now();
        let target = job.target_path();
        let total = job.recording.duration_secs() as f64;

        if target.exists() && !job.overwrite {
            debug!("'{}' already exists, skipping.", target.display());
            report(&status(ACTION_SKIPPING, &job.file_name, 0.0, 0.0));
            return Ok(DownloadOutcome::Skipped(target));
        }

        report(&status(ACTION_DOWNLOADING, &job.file_name, 0.0, total));
        let ts_path = intermediate_path(&target);

        let fetched = self.fetch_stream(client, job, &ts_path, report).await;
        let bytes_written = match fetched {
            Ok(0) => {
                remove_partial(&ts_path).await;
                return Err(AppError::Stream(format!("No media received for '{}'", job.file_name)).into());
            }
            Ok(n) => n,
            Err(e) => {
                remove_partial(&ts_path).await;
                return Err(e);
            }
        };

        report(&status(ACTION_CONVERTING, &job.file_name, 0.0, total));
        self.converter
            .convert(&ts_path, &target)
            .await
            .with_context(|| format!("Failed to convert '{}'", ts_path.display()))?;
        tokio::fs::remove_file(&ts_path)
            .await
            .with_context(|| format!("Failed to remove intermediate file '{}'", ts_path.display()))?;

        report(&status(ACTION_FINISHED, &job.file_name, total, total));
        info!(
            "💾 Saved '{}' ({} bytes of stream) in {:?}",
            target.display(),
            bytes_written,
            start_time.elapsed()
        );
        Ok(DownloadOutcome::Downloaded(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device_client::{ChildDevice, PlaybackChunk, PlaybackStream};
    use crate::download::ts_clock::tests::pes_packet;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    struct ScriptedStream(VecDeque<Vec<u8>>);

    #[async_trait]
    impl PlaybackStream for ScriptedStream {
        async fn next_chunk(&mut self) -> Result<Option<PlaybackChunk>> {
            Ok(self.0.pop_front().map(|data| PlaybackChunk { data }))
        }
    }

    /// Yields its chunks, then fails instead of ending.
    struct BrokenStream(VecDeque<Vec<u8>>);

    #[async_trait]
    impl PlaybackStream for BrokenStream {
        async fn next_chunk(&mut self) -> Result<Option<PlaybackChunk>> {
            match self.0.pop_front() {
                Some(data) => Ok(Some(PlaybackChunk { data })),
                None => Err(AppError::Stream("connection reset".to_string()).into()),
            }
        }
    }

    struct ScriptedCamera {
        chunks: Vec<Vec<u8>>,
        breaks: bool,
    }

    #[async_trait]
    impl DeviceClient for ScriptedCamera {
        fn get_name(&self) -> String {
            "scripted".to_string()
        }
        async fn get_child_devices(&self) -> Result<Vec<ChildDevice>> {
            Ok(Vec::new())
        }
        async fn get_recording_dates(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn get_recordings(&self, _date: &str) -> Result<Vec<Recording>> {
            Ok(Vec::new())
        }
        async fn open_playback(&self, _recording: &Recording, _window: u32) -> Result<Box<dyn PlaybackStream>> {
            if self.breaks {
                Ok(Box::new(BrokenStream(self.chunks.clone().into())))
            } else {
                Ok(Box::new(ScriptedStream(self.chunks.clone().into())))
            }
        }
    }

    struct CopyConverter;

    #[async_trait]
    impl MediaConverter for CopyConverter {
        async fn convert(&self, input: &Path, output: &Path) -> Result<(), AppError> {
            tokio::fs::copy(input, output).await?;
            Ok(())
        }
    }

    fn job(dir: &Path) -> DownloadJob {
        DownloadJob {
            recording: Recording { start_time: 1_000, end_time: 1_010 },
            output_dir: dir.to_path_buf(),
            file_name: "clip.mp4".to_string(),
            window_size: 4,
            overwrite: false,
        }
    }

    #[tokio::test]
    async fn downloads_converts_and_reports() {
        let dir = tempdir().unwrap();
        let mut first = pes_packet(0);
        first.extend(pes_packet(90_000 * 4));
        let second = pes_packet(90_000 * 30); // beyond the window, clamped to total
        let camera = ScriptedCamera { chunks: vec![first.clone(), second.clone()], breaks: false };
        let downloader = StreamDownloader::new(Box::new(CopyConverter));

        let mut seen = Vec::new();
        let outcome = downloader
            .download(&camera, &job(dir.path()), &mut |s: &DownloadStatus| seen.push(s.clone()))
            .await
            .unwrap();

        let target = dir.path().join("clip.mp4");
        assert_eq!(outcome, DownloadOutcome::Downloaded(target.clone()));
        let written = std::fs::read(&target).unwrap();
        assert_eq!(written.len(), first.len() + second.len());
        assert!(!dir.path().join("clip.ts").exists());

        let actions: Vec<_> = seen.iter().map(|s| s.current_action.as_str()).collect();
        assert_eq!(
            actions,
            vec![ACTION_DOWNLOADING, ACTION_DOWNLOADING, ACTION_DOWNLOADING, ACTION_CONVERTING, ACTION_FINISHED]
        );
        assert_eq!(seen[1].progress, 4.0);
        assert_eq!(seen[2].progress, 10.0);
        assert_eq!(seen.last().unwrap().total, 10.0);
    }

    #[tokio::test]
    async fn existing_file_is_skipped() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"already here").unwrap();
        let camera = ScriptedCamera { chunks: vec![pes_packet(0)], breaks: false };
        let downloader = StreamDownloader::new(Box::new(CopyConverter));

        let mut seen = Vec::new();
        let outcome = downloader
            .download(&camera, &job(dir.path()), &mut |s: &DownloadStatus| seen.push(s.clone()))
            .await
            .unwrap();

        assert!(matches!(outcome, DownloadOutcome::Skipped(_)));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].current_action, ACTION_SKIPPING);
        assert_eq!(std::fs::read(dir.path().join("clip.mp4")).unwrap(), b"already here");
    }

    #[tokio::test]
    async fn overwrite_replaces_existing_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"old").unwrap();
        let camera = ScriptedCamera { chunks: vec![pes_packet(0)], breaks: false };
        let downloader = StreamDownloader::new(Box::new(CopyConverter));
        let mut overwrite_job = job(dir.path());
        overwrite_job.overwrite = true;

        let outcome = downloader
            .download(&camera, &overwrite_job, &mut |_: &DownloadStatus| {})
            .await
            .unwrap();
        assert!(matches!(outcome, DownloadOutcome::Downloaded(_)));
        assert_eq!(std::fs::read(dir.path().join("clip.mp4")).unwrap().len(), 188);
    }

    #[tokio::test]
    async fn empty_stream_is_an_error_and_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let camera = ScriptedCamera { chunks: Vec::new(), breaks: false };
        let downloader = StreamDownloader::new(Box::new(CopyConverter));

        let result = downloader
            .download(&camera, &job(dir.path()), &mut |_: &DownloadStatus| {})
            .await;
        assert!(result.is_err());
        assert!(!dir.path().join("clip.ts").exists());
        assert!(!dir.path().join("clip.mp4").exists());
    }

    #[tokio::test]
    async fn broken_stream_removes_partial_file() {
        let dir = tempdir().unwrap();
        let camera = ScriptedCamera { chunks: vec![pes_packet(0), pes_packet(90_000)], breaks: true };
        let downloader = StreamDownloader::new(Box::new(CopyConverter));

        let mut seen = Vec::new();
        let result = downloader
            .download(&camera, &job(dir.path()), &mut |s: &DownloadStatus| seen.push(s.clone()))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Stream(_))));
        assert_eq!(seen.last().unwrap().progress, 1.0);
        assert!(!dir.path().join("clip.ts").exists());
        assert!(!dir.path().join("clip.mp4").exists());
    }
}

use crate::errors::AppError;
use async_trait::async_trait;
use log::debug;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Turns a downloaded transport stream into the final container.
#[async_trait]
pub trait MediaConverter: Send + Sync {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), AppError>;
}

/// Remuxes with an external `ffmpeg` binary, copying streams without re-encoding.
pub struct FfmpegConverter {
    ffmpeg_path: String,
}

impl FfmpegConverter {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

#[async_trait]
impl MediaConverter for FfmpegConverter {
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), AppError> {
        let start_time = Instant::now();
        let result = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(input)
            .arg("-c")
            .arg("copy")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AppError::Conversion(format!("'{}' not found, is ffmpeg installed?", self.ffmpeg_path))
                } else {
                    AppError::Io(format!("Failed to run '{}': {}", self.ffmpeg_path, e))
                }
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(AppError::Conversion(format!(
                "ffmpeg exited with {} converting '{}': {}",
                result.status,
                input.display(),
                stderr.trim()
            )));
        }
        debug!("Converted '{}' -> '{}' in {:?}", input.display(), output.display(), start_time.elapsed());
        Ok(())
    }
}

use crate::errors::AppError;
use log::debug;
use std::path::{Path, PathBuf};

pub fn ensure_output_directory(dir_path: &Path) -> Result<PathBuf, AppError> {
    if !dir_path.exists() {
        debug!("Output directory '{}' does not exist, attempting to create it.", dir_path.display());
        std::fs::create_dir_all(dir_path).map_err(|e| {
            AppError::Io(format!(
                "Failed to create output directory '{}': {}",
                dir_path.display(),
                e
            ))
        })?;
    } else if !dir_path.is_dir() {
        return Err(AppError::Io(format!(
            "Output path '{}' exists but is not a directory.",
            dir_path.display()
        )));
    }
    Ok(dir_path.to_path_buf())
}

/// Path of the raw transport stream kept next to the final file while downloading.
pub fn intermediate_path(target: &Path) -> PathBuf {
    target.with_extension("ts")
}

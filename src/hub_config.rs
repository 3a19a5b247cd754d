use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Connection and output settings for one physical hub, loaded from a JSON file.
///
/// Every key is optional in the file; missing keys fall back to the defaults below.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HubConfig {
    pub output_root_dir: String,
    pub device_type: String, // e.g., "TAPO.HUB"
    pub host: String,
    pub user: String,
    pub password: String,
    pub cloud_password: String,
    pub super_secret_key: String,
    #[serde(rename = "playerID")]
    pub player_id: String,
    pub window_size: u32,
    pub overwrite_files: bool,

    // Derived per child camera at runtime, never read from disk.
    #[serde(skip)]
    pub output_dir: Option<PathBuf>,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            output_root_dir: "./output".to_string(),
            device_type: "TAPO.HUB".to_string(),
            host: String::new(),
            user: "admin".to_string(),
            password: String::new(),
            cloud_password: String::new(),
            super_secret_key: String::new(),
            player_id: String::new(),
            window_size: 50,
            overwrite_files: false,
            output_dir: None,
        }
    }
}

impl HubConfig {
    /// Points the output directory at `<output_root_dir>/<alias>` and returns it.
    pub fn set_output_directory(&mut self, alias: &str) -> PathBuf {
        let dir = PathBuf::from(&self.output_root_dir).join(alias);
        self.output_dir = Some(dir.clone());
        dir
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.host.trim().is_empty() {
            return Err(AppError::Config("host cannot be empty.".to_string()));
        }
        if self.output_root_dir.trim().is_empty() {
            return Err(AppError::Config(format!(
                "outputRootDir cannot be empty for hub '{}'.",
                self.host
            )));
        }
        if self.window_size == 0 {
            return Err(AppError::Config(format!(
                "windowSize must be greater than zero for hub '{}'.",
                self.host
            )));
        }
        Ok(())
    }
}

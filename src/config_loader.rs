use crate::hub_config::HubConfig;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const DEFAULT_CONFIG_DIR: &str = "./configs/";

/// Lists every `*.json` file directly inside `dir`, sorted by path.
pub fn discover_config_files(dir: &Path) -> Result<Vec<PathBuf>> {
    debug!("🔎 Scanning for hub configuration files in: {}", dir.display());
    if !dir.is_dir() {
        bail!("❌ Configuration directory '{}' does not exist or is not a directory.", dir.display());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read configuration directory '{}'. 📖", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("Failed to read an entry of '{}'", dir.display()))?
            .path();
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json && path.is_file() {
            files.push(path);
        } else {
            debug!("  Ignoring non-config entry: {}", path.display());
        }
    }
    files.sort();
    debug!("Found {} configuration file(s).", files.len());
    Ok(files)
}

pub fn load_hub_config(path: &Path) -> Result<HubConfig> {
    debug!("📄 Attempting to load hub config from: {}", path.display());
    let start_time = Instant::now();

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file '{}'. 📖", path.display()))?;

    let config: HubConfig = serde_json::from_str(&config_str)
        .with_context(|| format!("Failed to parse JSON configuration from '{}'. 💔", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Hub configuration validation failed for '{}' 👎", path.display()))?;

    debug!("Loaded hub config for '{}' in {:?}", config.host, start_time.elapsed());
    Ok(config)
}

/// Loads every configuration in `dir`. The first malformed file aborts the load.
pub fn load_all(dir: &Path) -> Result<Vec<(PathBuf, HubConfig)>> {
    let start_time = Instant::now();
    let files = discover_config_files(dir)?;
    let mut configs = Vec::with_capacity(files.len());
    for path in files {
        let config = load_hub_config(&path)?;
        configs.push((path, config));
    }
    info!(
        "✅ Loaded {} hub configuration(s) from '{}' in {:?}",
        configs.len(),
        dir.display(),
        start_time.elapsed()
    );
    Ok(configs)
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetcher::FetchOptions;
use crate::retry::RetryPolicy;
use crate::source::TransferOptions;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per segment (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/mbd/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MbdConfig {
    /// Size of each ranged request in segmented fetches.
    pub chunk_size_bytes: u64,
    /// Flush granularity for sequential fetches.
    pub buffer_size_bytes: usize,
    /// Ceilings below this resolution always take the progressive path.
    pub progressive_threshold: u32,
    /// Base URL of the playlist/thumbnail helper service.
    pub helper_url: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub ytdlp_path: String,
    pub connect_timeout_secs: u64,
    /// Abort a transfer stuck below 1 KiB/s for this long.
    pub low_speed_time_secs: u64,
    /// If missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for MbdConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: 10_485_760,
            buffer_size_bytes: 2 * 1024 * 1024,
            progressive_threshold: 1080,
            helper_url: "http://localhost:8000".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            connect_timeout_secs: 30,
            low_speed_time_secs: 60,
            retry: None,
        }
    }
}

impl MbdConfig {
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            ..TransferOptions::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryPolicy::from_config)
            .unwrap_or_default()
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            chunk_size: self.chunk_size_bytes.max(1),
            buffer_size: self.buffer_size_bytes.max(1),
            retry: self.retry_policy(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mbd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MbdConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<MbdConfig> {
    if !path.exists() {
        let default_cfg = MbdConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)
            .with_context(|| format!("failed to write default config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let cfg: MbdConfig =
        toml::from_str(&data).with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(cfg)
}

//! Configuration loading and config file resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (applied by the binary on top of the loaded file)
//! 2. Environment variable `VDUB_CONFIG` naming the TOML file
//! 3. Platform config file (`~/.config/vdub/config.toml` on Linux)
//! 4. Built-in defaults (code constants)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults are
//! used. A file that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "VDUB_CONFIG";

/// Top-level TOML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Parent directory for per-request scratch workspaces
    ///
    /// Default: `<system temp dir>/vdub`
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audio pipeline parameters (optional)
    #[serde(default)]
    pub audio: AudioConfig,

    /// External speech service endpoint (optional)
    #[serde(default)]
    pub services: ServicesConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Audio pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    /// Canonical sample rate every stage works at
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Output bitrate of the lossy encoder (kbit/s)
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,

    /// ffmpeg executable used by the encoder
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Target RMS level for synthesized narration
    #[serde(default = "default_voice_target_rms_dbfs")]
    pub voice_target_rms_dbfs: f32,

    /// Peak ceiling for synthesized narration
    #[serde(default = "default_voice_peak_ceiling_dbfs")]
    pub voice_peak_ceiling_dbfs: f32,

    /// Run instrumental extraction and voice synthesis concurrently
    #[serde(default = "default_true")]
    pub concurrent_branches: bool,
}

/// Speech service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicesConfig {
    /// Base URL of the speech model service
    #[serde(default = "default_service_url")]
    pub base_url: String,

    /// Per-call HTTP timeout (seconds)
    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("vdub")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_bitrate_kbps() -> u32 {
    192
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_voice_target_rms_dbfs() -> f32 {
    -20.0
}

fn default_voice_peak_ceiling_dbfs() -> f32 {
    -1.0
}

fn default_true() -> bool {
    true
}

fn default_service_url() -> String {
    "http://127.0.0.1:8600".to_string()
}

fn default_service_timeout_secs() -> u64 {
    120
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            logging: LoggingConfig::default(),
            audio: AudioConfig::default(),
            services: ServicesConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            bitrate_kbps: default_bitrate_kbps(),
            ffmpeg_path: default_ffmpeg_path(),
            voice_target_rms_dbfs: default_voice_target_rms_dbfs(),
            voice_peak_ceiling_dbfs: default_voice_peak_ceiling_dbfs(),
            concurrent_branches: true,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            base_url: default_service_url(),
            timeout_secs: default_service_timeout_secs(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// Missing file → warning + defaults. Unreadable or malformed file → error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Resolve the config file location and load it
    ///
    /// Falls back to defaults when no file is found anywhere.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) => Self::load(&path),
            None => {
                info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192_000 {
            return Err(Error::Config(format!(
                "audio.sample_rate {} out of range (8000-192000)",
                self.audio.sample_rate
            )));
        }
        if self.audio.bitrate_kbps == 0 {
            return Err(Error::Config("audio.bitrate_kbps must be positive".to_string()));
        }
        if self.audio.voice_peak_ceiling_dbfs > 0.0 {
            return Err(Error::Config(format!(
                "audio.voice_peak_ceiling_dbfs {} must not exceed 0 dBFS",
                self.audio.voice_peak_ceiling_dbfs
            )));
        }
        if self.audio.voice_target_rms_dbfs > self.audio.voice_peak_ceiling_dbfs {
            return Err(Error::Config(
                "audio.voice_target_rms_dbfs must be below the peak ceiling".to_string(),
            ));
        }
        if self.services.base_url.trim().is_empty() {
            return Err(Error::Config("services.base_url must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Find the config file following the documented priority order
///
/// 1. Command-line path (returned even if it does not exist, so the caller warns)
/// 2. `VDUB_CONFIG` environment variable
/// 3. Platform config directory, if the file exists there
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// Platform default config file path (`<config dir>/vdub/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vdub").join("config.toml"))
}

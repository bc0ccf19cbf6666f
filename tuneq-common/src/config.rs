//! Bootstrap configuration loading and music root resolution
//!
//! Every key in the TOML file is optional. A missing file is not an error:
//! the player starts with compiled defaults and logs a warning.
//!
//! Music root resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the music root folder
pub const MUSIC_ROOT_ENV: &str = "TUNEQ_MUSIC_ROOT";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder whose subdirectories are playlists
    pub music_root: Option<PathBuf>,

    /// Playback behavior tuning
    pub playback: PlaybackToml,

    /// Audio output device selection
    pub output: OutputToml,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// `[playback]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackToml {
    /// Control loop tick period (render + auto-advance check)
    pub tick_interval_ms: u64,
    /// Seek distance for a single ←/→ press
    pub seek_step_secs: u64,
    /// Gain exponent change per ↑/↓ press
    pub volume_step: f64,
    /// Gain exponent at which the player goes silent
    pub volume_floor: f64,
    /// Maximum gain exponent
    pub volume_ceiling: f64,
    /// Base of the exponential gain curve
    pub volume_base: f64,
    /// Below this position, "previous" goes back one more track
    pub rewind_threshold_secs: u64,
    /// Number of upcoming tracks shown on the player page
    pub upcoming_preview: usize,
    /// Start every playlist shuffled
    pub shuffle: bool,
}

impl Default for PlaybackToml {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            seek_step_secs: 10,
            volume_step: 0.1,
            volume_floor: -4.0,
            volume_ceiling: 2.0,
            volume_base: 2.0,
            rewind_threshold_secs: 10,
            upcoming_preview: 5,
            shuffle: false,
        }
    }
}

/// `[output]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputToml {
    /// Output device name (None = system default)
    pub device: Option<String>,
    /// Preferred output sample rate
    pub sample_rate: u32,
    /// Output buffer length
    pub buffer_ms: u32,
}

impl Default for OutputToml {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: 44100,
            buffer_ms: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (defaults to the tuneq data directory)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from an explicit path, or from the platform default
    /// location when `path` is None.
    ///
    /// An explicit path that does not exist is an error; a missing default file
    /// falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::NotFound(format!("Config file {}", p.display())));
                }
                p.to_path_buf()
            }
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                Some(p) => {
                    warn!("No config file at {}, using defaults", p.display());
                    return Ok(Self::default());
                }
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Loading config from {}", config_path.display());
        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }
}

/// Platform config file location (`~/.config/tuneq/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tuneq").join("config.toml"))
}

/// Platform data directory for logs (`~/.local/share/tuneq` on Linux)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tuneq"))
        .unwrap_or_else(|| PathBuf::from("./tuneq_data"))
}

/// Resolve the music root folder.
///
/// Priority: CLI argument, then `env_var_name`, then the TOML value, then
/// `~/Music` (or `./musics` when no home directory is known).
pub fn resolve_music_root(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml.music_root.as_ref() {
        return path.clone();
    }

    default_music_root()
}

/// OS-dependent default music folder
fn default_music_root() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join("Music")))
        .unwrap_or_else(|| PathBuf::from("./musics"))
}

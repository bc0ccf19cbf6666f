//! Player configuration
//!
//! Merges the command line, environment and TOML bootstrap file into one
//! validated [`PlayerConfig`].
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables (`TUNEQ_*`, read by clap)
//! 3. TOML configuration file
//! 4. Built-in defaults

use crate::control::session::SessionOptions;
use crate::error::{Error, Result};
use crate::playback::controls::VolumeSettings;
use crate::playback::engine::EngineSettings;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tuneq_common::config::{default_data_dir, resolve_music_root, TomlConfig, MUSIC_ROOT_ENV};

/// Command-line arguments for tuneq
#[derive(Parser, Debug, Default)]
#[command(name = "tuneq")]
#[command(about = "Terminal music player for local playlists")]
#[command(version)]
pub struct Args {
    /// Folder whose subdirectories are playlists
    #[arg(short, long, env = "TUNEQ_MUSIC_ROOT")]
    pub music_root: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long, env = "TUNEQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Start playlists shuffled
    #[arg(short, long)]
    pub shuffle: bool,

    /// Audio output device name
    #[arg(short, long, env = "TUNEQ_DEVICE")]
    pub device: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TUNEQ_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Print the available output devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

/// Fully resolved settings for one run of the player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub music_root: PathBuf,
    pub shuffle: bool,
    pub device: Option<String>,
    pub sample_rate: u32,
    pub buffer_ms: u32,
    pub log_level: String,
    pub log_file: PathBuf,
    pub tick_interval: Duration,
    pub upcoming_preview: usize,
    pub engine: EngineSettings,
}

impl PlayerConfig {
    /// Merge `args` over `toml` and validate the result
    pub fn resolve(args: &Args, toml: &TomlConfig) -> Result<Self> {
        // clap already folded the environment into `args`
        let music_root = resolve_music_root(args.music_root.as_deref(), MUSIC_ROOT_ENV, toml);
        let playback = &toml.playback;

        let config = Self {
            music_root,
            shuffle: args.shuffle || playback.shuffle,
            device: args.device.clone().or_else(|| toml.output.device.clone()),
            sample_rate: toml.output.sample_rate,
            buffer_ms: toml.output.buffer_ms,
            log_level: args
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
            log_file: toml
                .logging
                .file
                .clone()
                .unwrap_or_else(|| default_data_dir().join("tuneq.log")),
            tick_interval: Duration::from_millis(playback.tick_interval_ms),
            upcoming_preview: playback.upcoming_preview,
            engine: EngineSettings {
                seek_step_secs: playback.seek_step_secs,
                volume_step: playback.volume_step,
                rewind_threshold_secs: playback.rewind_threshold_secs,
                volume: VolumeSettings {
                    base: playback.volume_base,
                    floor: playback.volume_floor,
                    ceiling: playback.volume_ceiling,
                },
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the player cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(Error::Config("tick_interval_ms must be positive".to_string()));
        }
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }
        if self.buffer_ms == 0 {
            return Err(Error::Config("buffer_ms must be positive".to_string()));
        }

        let volume = &self.engine.volume;
        if volume.floor >= volume.ceiling {
            return Err(Error::Config(format!(
                "volume_floor ({}) must be below volume_ceiling ({})",
                volume.floor, volume.ceiling
            )));
        }
        if volume.base <= 0.0 {
            return Err(Error::Config("volume_base must be positive".to_string()));
        }
        if self.engine.volume_step <= 0.0 {
            return Err(Error::Config("volume_step must be positive".to_string()));
        }
        Ok(())
    }

    /// Output buffer length in frames at the configured rate
    pub fn buffer_frames(&self) -> u32 {
        (self.sample_rate as u64 * self.buffer_ms as u64 / 1000) as u32
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            tick_interval: self.tick_interval,
            upcoming_preview: self.upcoming_preview,
        }
    }

    pub fn music_root(&self) -> &Path {
        &self.music_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["tuneq", "--music-root", "/srv/music"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::resolve(&args(&[]), &TomlConfig::default()).unwrap();

        assert_eq!(config.music_root, PathBuf::from("/srv/music"));
        assert!(!config.shuffle);
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.engine, EngineSettings::default());
        assert_eq!(config.buffer_frames(), 4410);
        assert_eq!(config.session_options().upcoming_preview, 5);
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml = TomlConfig::from_toml_str(
            r#"
            music_root = "/toml/music"
            [output]
            device = "Speakers"
            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        let config =
            PlayerConfig::resolve(&args(&["--device", "Headphones", "--shuffle"]), &toml).unwrap();
        assert_eq!(config.music_root, PathBuf::from("/srv/music"));
        assert_eq!(config.device.as_deref(), Some("Headphones"));
        assert_eq!(config.log_level, "warn");
        assert!(config.shuffle);
    }

    #[test]
    fn test_toml_playback_values_flow_through() {
        let toml = TomlConfig::from_toml_str(
            r#"
            [playback]
            seek_step_secs = 5
            rewind_threshold_secs = 3
            volume_floor = -2.0
            "#,
        )
        .unwrap();

        let config = PlayerConfig::resolve(&args(&[]), &toml).unwrap();
        assert_eq!(config.engine.seek_step_secs, 5);
        assert_eq!(config.engine.rewind_threshold_secs, 3);
        assert_eq!(config.engine.volume.floor, -2.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for document in [
            "[playback]\ntick_interval_ms = 0",
            "[playback]\nvolume_floor = 3.0",
            "[output]\nsample_rate = 0",
        ] {
            let toml = TomlConfig::from_toml_str(document).unwrap();
            let err = PlayerConfig::resolve(&args(&[]), &toml).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "accepted: {}", document);
        }
    }
}

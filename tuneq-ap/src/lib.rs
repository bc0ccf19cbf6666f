//! # tuneq Audio Player Library (tuneq-ap)
//!
//! Local-file music player with gapless queue advancement.
//!
//! **Architecture:** tracks are decoded whole into memory (symphonia, with
//! rubato resampling to the device rate), played through a position-tracking
//! stream with volume and pause control, and handed to cpal through an
//! atomically swapped slot. The next track is always preloading in the
//! background so advancing is a pointer swap.
//!
//! Modules:
//! - `audio`: decode, resample, sample buffers, device output
//! - `playback`: positioner, controls, queue, preload and engine
//! - `control`: the session control loop
//! - `library`: playlists from the music root
//! - `tui`: keyboard mapping and page drawing

pub mod audio;
pub mod config;
pub mod control;
pub mod error;
pub mod library;
pub mod playback;
pub mod tui;

pub use error::{Error, Result};

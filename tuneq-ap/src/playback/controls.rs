//! Volume and pause control
//!
//! Gain is `base ^ volume` where `volume` is a signed exponent, so each +1.0
//! step doubles the amplitude with the default base of 2. The silent flag is
//! separate from the numeric gain: it is set when the volume is pushed below
//! the floor and cleared by the next increase.
//!
//! All fields are atomics. The control loop is the only writer; the render
//! callback only reads.

use crate::audio::stream::Streamer;
use crate::audio::types::{fill_silence, AudioFrame};
use crate::error::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Bounds and curve of the volume exponent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSettings {
    pub base: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            base: 2.0,
            floor: -4.0,
            ceiling: 2.0,
        }
    }
}

/// Session-wide volume and pause state shared with the render path.
#[derive(Debug)]
pub struct PlaybackControls {
    settings: VolumeSettings,
    volume_bits: AtomicU64,
    silent: AtomicBool,
    paused: AtomicBool,
}

impl PlaybackControls {
    pub fn new(settings: VolumeSettings) -> Self {
        Self {
            settings,
            volume_bits: AtomicU64::new(0.0f64.to_bits()),
            silent: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> VolumeSettings {
        self.settings
    }

    /// Current volume exponent
    pub fn volume(&self) -> f64 {
        f64::from_bits(self.volume_bits.load(Ordering::Acquire))
    }

    fn set_volume(&self, volume: f64) {
        self.volume_bits.store(volume.to_bits(), Ordering::Release);
    }

    pub fn is_silent(&self) -> bool {
        self.silent.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Flip the pause flag, returning the new state
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    /// Raise the volume by `step`, never above the ceiling.
    ///
    /// Always clears the silent flag, even when already at the ceiling.
    pub fn increase(&self, step: f64) {
        self.silent.store(false, Ordering::Release);
        let volume = self.volume();
        if volume >= self.settings.ceiling {
            return;
        }
        self.set_volume((volume + step).min(self.settings.ceiling));
    }

    /// Lower the volume by `step`.
    ///
    /// At or below the floor this only sets the silent flag.
    pub fn decrease(&self, step: f64) {
        let volume = self.volume();
        if volume <= self.settings.floor {
            self.silent.store(true, Ordering::Release);
            return;
        }
        self.set_volume((volume - step).max(self.settings.floor));
    }

    /// Linear amplitude multiplier applied to samples
    pub fn gain(&self) -> f32 {
        if self.is_silent() {
            return 0.0;
        }
        self.settings.base.powf(self.volume()) as f32
    }

    /// Volume as shown on the player page.
    ///
    /// Positive exponents map to 50 + 25 per step, the rest to 12.5 per step
    /// above -4.
    pub fn volume_percent(&self) -> f64 {
        let volume = self.volume();
        if volume > 0.0 {
            volume * 25.0 + 50.0
        } else {
            (4.0 + volume) * 12.5
        }
    }
}

impl Default for PlaybackControls {
    fn default() -> Self {
        Self::new(VolumeSettings::default())
    }
}

/// Applies [`PlaybackControls`] to a wrapped stream.
///
/// While paused the inner stream is not pulled at all, so its position stays
/// exactly where it was.
pub struct Controller<S> {
    inner: S,
    controls: Arc<PlaybackControls>,
}

impl<S: Streamer> Controller<S> {
    pub fn new(inner: S, controls: Arc<PlaybackControls>) -> Self {
        Self { inner, controls }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn controls(&self) -> &Arc<PlaybackControls> {
        &self.controls
    }
}

impl<S: Streamer> Streamer for Controller<S> {
    fn stream(&mut self, frames: &mut [AudioFrame]) -> Result<(usize, bool)> {
        if self.controls.is_paused() {
            fill_silence(frames);
            return Ok((frames.len(), true));
        }

        let (written, more) = self.inner.stream(frames)?;
        let gain = self.controls.gain();
        for frame in &mut frames[..written] {
            frame.apply_volume(gain);
        }
        Ok((written, more))
    }
}

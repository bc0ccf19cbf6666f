//! Playback slot: one decoded track ready to be rendered
//!
//! A slot bundles the decoded buffer, its positioner and the volume/pause
//! controller. Slots are shared as `Arc<Slot>`: the output router holds one for
//! the render callback, the engine holds one for control. Replacing the
//! current track means swapping which `Arc<Slot>` the router points at, never
//! mutating a slot into another track.

use crate::audio::stream::Streamer;
use crate::audio::types::{fill_silence, AudioFrame, SampleBuffer, TrackFormat};
use crate::playback::controls::{Controller, PlaybackControls};
use crate::playback::positioner::{PositionHandle, Positioner};
use crate::playback::queue::QueueEntry;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::error;

pub struct Slot {
    entry: QueueEntry,
    format: TrackFormat,
    len: usize,
    position: PositionHandle,
    chain: Mutex<Controller<Positioner>>,
    /// First render error, if any. Rendering stops producing audio after it.
    failure: OnceLock<String>,
}

impl Slot {
    pub fn new(entry: QueueEntry, buffer: SampleBuffer, controls: Arc<PlaybackControls>) -> Self {
        let positioner = Positioner::new(Arc::new(buffer));
        Self::from_positioner(entry, positioner, controls)
    }

    pub fn from_positioner(
        entry: QueueEntry,
        positioner: Positioner,
        controls: Arc<PlaybackControls>,
    ) -> Self {
        Self {
            entry,
            format: positioner.format(),
            len: positioner.len(),
            position: positioner.handle(),
            chain: Mutex::new(Controller::new(positioner, controls)),
            failure: OnceLock::new(),
        }
    }

    pub fn entry(&self) -> &QueueEntry {
        &self.entry
    }

    pub fn format(&self) -> TrackFormat {
        self.format
    }

    /// Track length in frames
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current frame position, read without taking the render lock
    pub fn position(&self) -> usize {
        self.position.get()
    }

    /// Position has reached the end of the buffer
    pub fn is_finished(&self) -> bool {
        self.position() >= self.len
    }

    fn lock_chain(&self) -> MutexGuard<'_, Controller<Positioner>> {
        self.chain.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seek to frame `target` (clamped to the track)
    pub fn seek(&self, target: i64) {
        self.lock_chain().inner_mut().seek(target);
    }

    /// Error raised while rendering, if any
    pub fn failure(&self) -> Option<String> {
        self.failure.get().cloned()
    }

    /// Mark the slot as failed. Only the first reason is kept; the slot
    /// renders silence from now on and the engine ends the session on its
    /// next tick.
    pub fn fail(&self, reason: String) {
        error!("Render failed for {}: {}", self.entry.track.display_name(), reason);
        let _ = self.failure.set(reason);
    }

    /// Fill `frames` for the output device.
    ///
    /// Called from the audio callback. Anything past the end of the track,
    /// and everything after a render error, is silence.
    pub fn render(&self, frames: &mut [AudioFrame]) {
        if self.failure.get().is_some() {
            fill_silence(frames);
            return;
        }

        let streamed = self.lock_chain().stream(frames);
        match streamed {
            Ok((written, _more)) => fill_silence(&mut frames[written..]),
            Err(e) => {
                self.fail(e.to_string());
                fill_silence(frames);
            }
        }
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("track", &self.entry.track.display_name())
            .field("position", &self.position())
            .field("len", &self.len)
            .finish()
    }
}

//! Position-tracking stream over a decoded track
//!
//! The positioner owns the active [`BufferSource`] and counts every frame it
//! hands out. Seeking throws the source away and derives a fresh one from the
//! shared buffer, so nothing read after a seek can come from the old offset.

use crate::audio::stream::{BufferSource, Streamer};
use crate::audio::types::{AudioFrame, SampleBuffer, TrackFormat};
use crate::error::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Lock-free read handle on a positioner's frame position.
///
/// Updated by the positioner on every stream and seek; read by status
/// snapshots and the auto-advance check without touching the render lock.
#[derive(Debug, Clone, Default)]
pub struct PositionHandle(Arc<AtomicUsize>);

impl PositionHandle {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, position: usize) {
        self.0.store(position, Ordering::Release);
    }
}

/// Streams a [`SampleBuffer`] and tracks the cumulative frame position.
///
/// Invariant: `0 <= position <= len`.
pub struct Positioner {
    source: Box<dyn Streamer>,
    position: usize,
    format: TrackFormat,
    buffer: Arc<SampleBuffer>,
    published: PositionHandle,
}

impl Positioner {
    /// Positioner at the start of `buffer`
    pub fn new(buffer: Arc<SampleBuffer>) -> Self {
        let format = buffer.format();
        Self {
            source: Box::new(BufferSource::from_offset(Arc::clone(&buffer), 0)),
            position: 0,
            format,
            buffer,
            published: PositionHandle::default(),
        }
    }

    /// Replace the sample source without touching the position.
    ///
    /// Lets tests inject a failing source; normal playback never needs it.
    pub fn with_source(mut self, source: Box<dyn Streamer>) -> Self {
        self.source = source;
        self
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Buffer length in frames
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn format(&self) -> TrackFormat {
        self.format
    }

    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    /// Whether every frame has been handed out
    pub fn is_finished(&self) -> bool {
        self.position >= self.buffer.len()
    }

    pub fn handle(&self) -> PositionHandle {
        self.published.clone()
    }

    /// Jump to frame `target`, clamped to `[0, len]`.
    ///
    /// Takes a signed target so callers can pass `position - step` directly.
    pub fn seek(&mut self, target: i64) {
        let clamped = target.clamp(0, self.buffer.len() as i64) as usize;
        self.source = Box::new(BufferSource::from_offset(Arc::clone(&self.buffer), clamped));
        self.position = clamped;
        self.published.set(clamped);
    }
}

impl Streamer for Positioner {
    fn stream(&mut self, frames: &mut [AudioFrame]) -> Result<(usize, bool)> {
        let (written, more) = self.source.stream(frames)?;
        self.position = (self.position + written).min(self.buffer.len());
        self.published.set(self.position);
        Ok((written, more))
    }
}

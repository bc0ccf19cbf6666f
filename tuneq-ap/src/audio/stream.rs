//! Pull-based frame streaming
//!
//! Everything between the sample buffer and the output device is a
//! [`Streamer`]: the render path asks for N frames and gets back how many were
//! written plus whether more will follow.

use crate::audio::types::{AudioFrame, SampleBuffer};
use crate::error::Result;
use std::sync::Arc;

/// Source of audio frames.
pub trait Streamer: Send {
    /// Write up to `frames.len()` frames into `frames`.
    ///
    /// Returns `(written, more)`. `more` is false once the source is
    /// exhausted; frames past `written` are left untouched.
    fn stream(&mut self, frames: &mut [AudioFrame]) -> Result<(usize, bool)>;
}

/// Reads frames `[from, to)` out of a shared [`SampleBuffer`].
#[derive(Debug, Clone)]
pub struct BufferSource {
    buffer: Arc<SampleBuffer>,
    cursor: usize,
    end: usize,
}

impl BufferSource {
    /// Sub-stream of `buffer` from `from` up to (not including) `to`.
    ///
    /// Both bounds are clamped to the buffer length.
    pub fn new(buffer: Arc<SampleBuffer>, from: usize, to: usize) -> Self {
        let end = to.min(buffer.len());
        let cursor = from.min(end);
        Self { buffer, cursor, end }
    }

    /// Whole-buffer stream starting at `from`
    pub fn from_offset(buffer: Arc<SampleBuffer>, from: usize) -> Self {
        let len = buffer.len();
        Self::new(buffer, from, len)
    }

    /// Frames still to be read
    pub fn remaining(&self) -> usize {
        self.end - self.cursor
    }
}

impl Streamer for BufferSource {
    fn stream(&mut self, frames: &mut [AudioFrame]) -> Result<(usize, bool)> {
        let count = frames.len().min(self.remaining());
        for (offset, slot) in frames[..count].iter_mut().enumerate() {
            // get_frame is in range: cursor + offset < end <= len
            *slot = self
                .buffer
                .get_frame(self.cursor + offset)
                .unwrap_or_default();
        }
        self.cursor += count;
        Ok((count, self.cursor < self.end))
    }
}

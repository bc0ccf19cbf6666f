//! Decoded audio: track format, whole-track sample buffers and stereo frames

/// Format of a decoded track.
///
/// `sample_rate` is the rate of the samples held in the buffer (after any
/// resampling); `channels` is the channel count of the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl TrackFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self { sample_rate, channels }
    }

    /// Frames covering `seconds` at this rate (`seconds × sample_rate`)
    pub fn frames_for_secs(&self, seconds: u64) -> usize {
        (seconds * self.sample_rate as u64) as usize
    }

    /// Whole seconds covered by `frames`
    pub fn secs_for_frames(&self, frames: usize) -> u64 {
        tuneq_common::human_time::frames_to_secs(frames, self.sample_rate)
    }
}

/// One fully decoded track, resident in memory for random access.
///
/// Samples are interleaved stereo `f32` (`[L, R, L, R, ...]`); mono sources
/// arrive here already duplicated to both sides.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    format: TrackFormat,
    frame_count: usize,
}

impl SampleBuffer {
    /// Create a buffer from interleaved stereo samples.
    ///
    /// A trailing half frame is dropped.
    pub fn new(mut samples: Vec<f32>, format: TrackFormat) -> Self {
        if samples.len() % 2 != 0 {
            samples.pop();
        }
        let frame_count = samples.len() / 2;
        Self {
            samples,
            format,
            frame_count,
        }
    }

    /// Buffer of `frame_count` frames where every frame is `(value, value)`
    pub fn constant(frame_count: usize, value: f32, format: TrackFormat) -> Self {
        Self::new(vec![value; frame_count * 2], format)
    }

    pub fn format(&self) -> TrackFormat {
        self.format
    }

    /// Number of frames in the buffer
    pub fn len(&self) -> usize {
        self.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Track length in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.format.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f32 / self.format.sample_rate as f32
    }

    /// Frame at `index`, or None past the end
    pub fn get_frame(&self, index: usize) -> Option<AudioFrame> {
        self.samples
            .get(index * 2..index * 2 + 2)
            .map(|pair| AudioFrame::from_stereo(pair[0], pair[1]))
    }
}

/// One stereo frame as handed to the output device
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioFrame {
    pub left: f32,
    pub right: f32,
}

impl AudioFrame {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_stereo(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Multiply both channels by `gain`
    pub fn apply_volume(&mut self, gain: f32) {
        self.left *= gain;
        self.right *= gain;
    }

    /// Limit both channels to the device range `[-1.0, 1.0]`
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }
}

/// Fill `frames` with silence
pub fn fill_silence(frames: &mut [AudioFrame]) {
    frames.fill(AudioFrame::zero());
}

//! Audio decode, buffering and device output
//!
//! Pipeline: `decoder` (symphonia) → `resampler` (rubato, only when the
//! device rate differs) → `types::SampleBuffer` → `stream::BufferSource`
//! → `output` (cpal).

pub mod decoder;
pub mod output;
pub mod resampler;
pub mod stream;
pub mod types;

pub use decoder::{SymphoniaDecoder, TrackDecoder};
pub use output::{AudioSink, CpalSink, OutputRouter};
pub use stream::{BufferSource, Streamer};
pub use types::{AudioFrame, SampleBuffer, TrackFormat};

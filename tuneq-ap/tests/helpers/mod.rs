//! Test helpers for tuneq-ap integration tests
//!
//! - MockDecoder: in-memory tracks with optional failures and gated decodes
//! - RecordingSink: audio sink that renders on demand and records submissions
//! - audio_generator: WAV fixtures for the real decoder

#![allow(dead_code)]

pub mod audio_generator;
pub mod mock_decoder;
pub mod recording_sink;

pub use mock_decoder::{Gate, MockDecoder};
pub use recording_sink::RecordingSink;

use std::time::Duration;
use tokio::sync::mpsc;
use tuneq_ap::playback::PreloadNotice;

/// Sample rate of every mock track
pub const TEST_RATE: u32 = 1000;

/// Wait for the next preload notice, failing the test after a few seconds
pub async fn next_notice(notices: &mut mpsc::UnboundedReceiver<PreloadNotice>) -> PreloadNotice {
    tokio::time::timeout(Duration::from_secs(5), notices.recv())
        .await
        .expect("timed out waiting for preload notice")
        .expect("preload notice channel closed")
}

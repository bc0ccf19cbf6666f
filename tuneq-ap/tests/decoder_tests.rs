//! Decoder tests against real WAV files
//!
//! Fixtures are generated with hound into a temp directory.

mod helpers;

use helpers::audio_generator::generate_sine_wav;
use tempfile::TempDir;
use tuneq_ap::audio::{SymphoniaDecoder, TrackDecoder};
use tuneq_ap::Error;

#[test]
fn test_decode_stereo_wav() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stereo.wav");
    generate_sine_wav(&path, 44_100, 2, 44_100, 440.0, 0.5).unwrap();

    let buffer = SymphoniaDecoder::new(None).decode(&path).unwrap();

    assert_eq!(buffer.format().sample_rate, 44_100);
    assert_eq!(buffer.format().channels, 2);
    assert_eq!(buffer.len(), 44_100);
    assert!((buffer.duration_seconds() - 1.0).abs() < 0.001);

    let peak = (0..buffer.len())
        .filter_map(|i| buffer.get_frame(i))
        .map(|f| f.left.abs())
        .fold(0.0f32, f32::max);
    assert!(peak > 0.45 && peak < 0.55, "peak {}", peak);
}

#[test]
fn test_mono_is_duplicated_to_both_channels() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mono.wav");
    generate_sine_wav(&path, 22_050, 1, 2_205, 440.0, 0.5).unwrap();

    let buffer = SymphoniaDecoder::new(None).decode(&path).unwrap();

    assert_eq!(buffer.format().channels, 1);
    assert_eq!(buffer.len(), 2_205);
    for i in 0..buffer.len() {
        let frame = buffer.get_frame(i).unwrap();
        assert_eq!(frame.left, frame.right);
    }
}

#[test]
fn test_resamples_to_output_rate() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cd.wav");
    generate_sine_wav(&path, 44_100, 2, 44_100, 440.0, 0.5).unwrap();

    let buffer = SymphoniaDecoder::new(Some(48_000)).decode(&path).unwrap();

    assert_eq!(buffer.format().sample_rate, 48_000);
    let frames = buffer.len();
    assert!(frames > 47_000 && frames <= 48_000, "got {} frames", frames);
}

#[test]
fn test_matching_output_rate_skips_resampling() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("same.wav");
    generate_sine_wav(&path, 48_000, 2, 4_800, 440.0, 0.5).unwrap();

    let buffer = SymphoniaDecoder::new(Some(48_000)).decode(&path).unwrap();
    assert_eq!(buffer.len(), 4_800);
}

#[test]
fn test_missing_file_is_resource_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = SymphoniaDecoder::new(None)
        .decode(&dir.path().join("missing.mp3"))
        .unwrap_err();

    assert!(matches!(err, Error::ResourceUnavailable(_)));
}

#[test]
fn test_garbage_file_is_decode_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noise.mp3");
    std::fs::write(&path, b"this is not audio at all").unwrap();

    let err = SymphoniaDecoder::new(None).decode(&path).unwrap_err();
    assert!(matches!(err, Error::DecodeFailure(_)));
}

//! Audio decoder using symphonia
//!
//! Decodes a whole track into memory. Playback never streams from the
//! compressed file: seeking works on the decoded buffer only.

use crate::audio::resampler::Resampler;
use crate::audio::types::{SampleBuffer, TrackFormat};
use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer as SymphoniaSampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Turns a track file into a fully decoded [`SampleBuffer`].
///
/// Implementations are called from the blocking preload pool as well as
/// from the control loop, so they must be shareable across threads.
pub trait TrackDecoder: Send + Sync {
    /// Decode the whole file at `path`.
    ///
    /// # Errors
    /// - `ResourceUnavailable` when the file cannot be opened
    /// - `DecodeFailure` when the data is corrupt or unsupported
    fn decode(&self, path: &Path) -> Result<SampleBuffer>;
}

/// Decoder backed by symphonia.
///
/// When `output_rate` is set, decoded audio at any other rate is resampled so
/// the buffer can be fed straight to the device.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    output_rate: Option<u32>,
}

impl SymphoniaDecoder {
    pub fn new(output_rate: Option<u32>) -> Self {
        Self { output_rate }
    }

    /// Decode entire audio file to interleaved stereo f32 samples.
    ///
    /// # Returns
    /// - `samples`: Interleaved stereo f32 samples
    /// - `sample_rate`: Source sample rate (before resampling)
    /// - `channels`: Number of channels in source (1=mono, 2=stereo, etc.)
    pub fn decode_file(path: &Path) -> Result<(Vec<f32>, u32, u16)> {
        debug!("Decoding entire file: {}", path.display());

        let file = std::fs::File::open(path).map_err(|e| {
            Error::ResourceUnavailable(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext_str);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::DecodeFailure(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::DecodeFailure("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::DecodeFailure("Sample rate not found".to_string()))?;

        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| Error::DecodeFailure("Channel count not found".to_string()))?;

        debug!(
            "Audio format: sample_rate={}, channels={}",
            sample_rate, channels
        );

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::DecodeFailure(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file");
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    debug!("Stream reset requested, stopping decode");
                    break;
                }
                Err(e) => {
                    return Err(Error::DecodeFailure(format!(
                        "Error reading packet: {}",
                        e
                    )));
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buf = SymphoniaSampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    append_stereo(buf.samples(), spec.channels.count(), &mut samples);
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet: drop it and keep going
                    warn!("Decode error in {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    return Err(Error::DecodeFailure(format!("Decoder failed: {}", e)));
                }
            }
        }

        if samples.is_empty() {
            return Err(Error::DecodeFailure(format!(
                "No audio decoded from {}",
                path.display()
            )));
        }

        debug!("Decoded {} frames", samples.len() / 2);

        Ok((samples, sample_rate, channels))
    }
}

impl TrackDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<SampleBuffer> {
        let (samples, source_rate, channels) = Self::decode_file(path)?;

        let (samples, sample_rate) = match self.output_rate {
            Some(rate) if rate != source_rate => {
                (Resampler::resample(&samples, source_rate, rate, 2)?, rate)
            }
            _ => (samples, source_rate),
        };

        Ok(SampleBuffer::new(samples, TrackFormat::new(sample_rate, channels)))
    }
}

/// Append interleaved samples with `channels` channels as interleaved stereo.
///
/// Mono is duplicated to both sides; anything wider keeps the first two channels.
fn append_stereo(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => {
            output.reserve(interleaved.len() * 2);
            for &sample in interleaved {
                output.push(sample);
                output.push(sample);
            }
        }
        2 => output.extend_from_slice(interleaved),
        n => {
            for frame in interleaved.chunks_exact(n) {
                output.push(frame[0]);
                output.push(frame[1]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_stereo_mono() {
        let mut out = Vec::new();
        append_stereo(&[0.5, -0.5], 1, &mut out);
        assert_eq!(out, vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_append_stereo_surround_keeps_front_pair() {
        let mut out = Vec::new();
        append_stereo(&[0.1, 0.2, 0.9, 0.9, 0.3, 0.4, 0.9, 0.9], 4, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_missing_file_is_resource_unavailable() {
        let decoder = SymphoniaDecoder::new(None);
        let err = decoder
            .decode(Path::new("/definitely/not/here.mp3"))
            .unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable(_)));
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"this is not audio at all").unwrap();

        let err = SymphoniaDecoder::new(None).decode(&path).unwrap_err();
        assert!(matches!(err, Error::DecodeFailure(_)));
    }
}

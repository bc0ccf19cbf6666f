//! Audio resampling using rubato
//!
//! Converts a decoded track to the output device rate so the render path
//! never has to convert on the fly.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Frames fed to rubato per call
const CHUNK_FRAMES: usize = 1024;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved audio from `input_rate` to `output_rate`.
    ///
    /// # Notes
    /// If the rates already match, returns a copy without resampling
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }

        if input_rate == 0 || output_rate == 0 || channels == 0 {
            return Err(Error::DecodeFailure(format!(
                "Cannot resample {}Hz -> {}Hz with {} channels",
                input_rate, output_rate, channels
            )));
        }

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            input_rate, output_rate, channels
        );

        // De-interleave samples for rubato (which expects planar format)
        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input[0].len();

        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0, // no runtime ratio changes
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            channels as usize,
        )
        .map_err(|e| Error::DecodeFailure(format!("Failed to create resampler: {}", e)))?;

        let expected = (input_frames as u64 * output_rate as u64 / input_rate as u64) as usize;
        let mut planar_output: Vec<Vec<f32>> =
            vec![Vec::with_capacity(expected + 2 * CHUNK_FRAMES); channels as usize];

        let mut offset = 0;
        while offset + CHUNK_FRAMES <= input_frames {
            let chunk: Vec<&[f32]> = planar_input
                .iter()
                .map(|ch| &ch[offset..offset + CHUNK_FRAMES])
                .collect();
            let out = resampler
                .process(&chunk, None)
                .map_err(|e| Error::DecodeFailure(format!("Resampling failed: {}", e)))?;
            Self::append_planar(&mut planar_output, out);
            offset += CHUNK_FRAMES;
        }

        if offset < input_frames {
            let tail: Vec<&[f32]> = planar_input.iter().map(|ch| &ch[offset..]).collect();
            let out = resampler
                .process_partial(Some(tail.as_slice()), None)
                .map_err(|e| Error::DecodeFailure(format!("Resampling failed: {}", e)))?;
            Self::append_planar(&mut planar_output, out);
        }

        // The first `delay` output frames precede the input; flush until the
        // frames covering the end of the input are out
        let delay = resampler.output_delay();
        while planar_output[0].len() < delay + expected {
            let out = resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| Error::DecodeFailure(format!("Resampling failed: {}", e)))?;
            if out[0].is_empty() {
                break;
            }
            Self::append_planar(&mut planar_output, out);
        }

        for channel in &mut planar_output {
            channel.drain(..delay.min(channel.len()));
            channel.truncate(expected);
        }
        let interleaved_output = Self::interleave(&planar_output);

        debug!(
            "Resampled {} input frames to {} output frames",
            input_frames,
            interleaved_output.len() / channels as usize
        );

        Ok(interleaved_output)
    }

    fn append_planar(output: &mut [Vec<f32>], chunk: Vec<Vec<f32>>) {
        for (dst, src) in output.iter_mut().zip(chunk) {
            dst.extend(src);
        }
    }

    /// Split interleaved samples into one vector per channel. A trailing
    /// partial frame is dropped.
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let channels = channels as usize;
        let samples = &samples[..samples.len() - samples.len() % channels];
        (0..channels)
            .map(|ch| samples.iter().skip(ch).step_by(channels).copied().collect())
            .collect()
    }

    /// Merge per-channel vectors back into interleaved samples, stopping at
    /// the shortest channel
    fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
        let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
        (0..frames)
            .flat_map(|i| planar.iter().map(move |ch| ch[i]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_conversion() {
        let planar = Resampler::deinterleave(&[0.1, -0.1, 0.2, -0.2, 0.3, -0.3], 2);
        assert_eq!(planar, vec![vec![0.1, 0.2, 0.3], vec![-0.1, -0.2, -0.3]]);

        // Ragged channels are cut to the shortest
        let ragged = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0]];
        assert_eq!(Resampler::interleave(&ragged), vec![1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_resample_same_rate() {
        let input = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let output = Resampler::resample(&input, 44100, 44100, 2).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn test_resample_length_follows_ratio() {
        // One second of stereo silence at 48kHz
        let input = vec![0.0f32; 48000 * 2];
        let output = Resampler::resample(&input, 48000, 44100, 2).unwrap();
        assert_eq!(output.len() / 2, 44100);
    }

    #[test]
    fn test_resample_keeps_signal_aligned() {
        // Constant level: after the delay is dropped, neither end should
        // ramp in from the zero history or out into the padding
        let input = vec![0.5f32; 44100 * 2];
        let output = Resampler::resample(&input, 44100, 48000, 2).unwrap();
        let frames = output.len() / 2;
        assert_eq!(frames, 48000);

        for frame in [16, frames / 2, frames - 16] {
            let left = output[frame * 2];
            assert!((left - 0.5).abs() < 0.01, "frame {} = {}", frame, left);
        }
    }

    #[test]
    fn test_resample_rejects_zero_rate() {
        let err = Resampler::resample(&[0.0, 0.0], 0, 44100, 2).unwrap_err();
        assert!(matches!(err, Error::DecodeFailure(_)));
    }
}

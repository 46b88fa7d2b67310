//! Audio resampling using rubato
//!
//! Converts planar audio to another sample rate while preserving duration:
//! the resampler's internal delay is trimmed from the front and the output is
//! cut to exactly `round(frames * ratio)` frames.

use crate::audio::types::AudioBuffer;
use crate::error::{PipelineError, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Input frames handed to rubato per call
const CHUNK_FRAMES: usize = 1024;

/// Audio resampler using rubato for sample rate conversion.
pub struct Resampler;

impl Resampler {
    /// Resample a buffer to `output_rate`.
    ///
    /// If the buffer is already at the target rate, returns a copy.
    ///
    /// # Errors
    /// `InvalidAudioState` if rubato rejects the ratio or fails mid-stream.
    pub fn resample(input: &AudioBuffer, output_rate: u32) -> Result<AudioBuffer> {
        let input_rate = input.sample_rate();

        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.clone());
        }

        let ratio = output_rate as f64 / input_rate as f64;
        let channels = input.channel_count();
        let frames = input.frames();
        let expected = (frames as f64 * ratio).round() as usize;

        debug!(
            "Resampling {} frames from {}Hz to {}Hz ({} channels)",
            frames, input_rate, output_rate, channels
        );

        if frames == 0 {
            return AudioBuffer::silent(0, channels, output_rate);
        }

        let mut resampler = Self::create_resampler(ratio, channels)?;
        let delay = resampler.output_delay();
        let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay); channels];

        // Full chunks
        let mut position = 0;
        while position + CHUNK_FRAMES <= frames {
            let slices: Vec<&[f32]> = input
                .channels()
                .iter()
                .map(|c| &c[position..position + CHUNK_FRAMES])
                .collect();
            let chunk = resampler
                .process(slices.as_slice(), None)
                .map_err(|e| PipelineError::InvalidAudioState(format!("Resampling failed: {}", e)))?;
            Self::append(&mut output, chunk);
            position += CHUNK_FRAMES;
        }

        // Remainder (zero-padded internally by rubato)
        if position < frames {
            let slices: Vec<&[f32]> = input.channels().iter().map(|c| &c[position..]).collect();
            let chunk = resampler
                .process_partial(Some(slices.as_slice()), None)
                .map_err(|e| PipelineError::InvalidAudioState(format!("Resampling failed: {}", e)))?;
            Self::append(&mut output, chunk);
        }

        // Flush the delay line until the expected length is covered
        while output[0].len() < expected + delay {
            let chunk = resampler
                .process_partial(None::<&[&[f32]]>, None)
                .map_err(|e| PipelineError::InvalidAudioState(format!("Resampling failed: {}", e)))?;
            if chunk[0].is_empty() {
                break;
            }
            Self::append(&mut output, chunk);
        }

        for channel in output.iter_mut() {
            channel.drain(..delay.min(channel.len()));
            channel.resize(expected, 0.0);
        }

        debug!("Resampled {} input frames to {} output frames", frames, expected);

        AudioBuffer::new(output, output_rate)
    }

    /// Create a rubato resampler.
    ///
    /// FastFixedIn with a septic polynomial is a good quality/performance
    /// tradeoff for speech and music beds.
    fn create_resampler(ratio: f64, channels: usize) -> Result<FastFixedIn<f32>> {
        FastFixedIn::<f32>::new(
            ratio,
            1.0, // max_relative_ratio (no runtime changes)
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            channels,
        )
        .map_err(|e| PipelineError::InvalidAudioState(format!("Failed to create resampler: {}", e)))
    }

    fn append(output: &mut [Vec<f32>], chunk: Vec<Vec<f32>>) {
        for (dst, src) in output.iter_mut().zip(chunk) {
            dst.extend(src);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_copy() {
        let input = AudioBuffer::mono(vec![0.1, 0.2, 0.3], 44100).unwrap();
        let output = Resampler::resample(&input, 44100).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_upsample_preserves_duration() {
        // 1 second at 16kHz → 1 second at 44.1kHz
        let input = AudioBuffer::silent(16000, 1, 16000).unwrap();
        let output = Resampler::resample(&input, 44100).unwrap();

        assert_eq!(output.sample_rate(), 44100);
        assert_eq!(output.frames(), 44100);
        assert_eq!(output.channel_count(), 1);
    }

    #[test]
    fn test_downsample_stereo_preserves_duration() {
        let input = AudioBuffer::silent(4800, 2, 48000).unwrap();
        let output = Resampler::resample(&input, 44100).unwrap();

        assert_eq!(output.frames(), 4410);
        assert_eq!(output.channel_count(), 2);
    }

    #[test]
    fn test_empty_input() {
        let input = AudioBuffer::silent(0, 2, 22050).unwrap();
        let output = Resampler::resample(&input, 44100).unwrap();
        assert!(output.is_empty());
        assert_eq!(output.sample_rate(), 44100);
    }
}

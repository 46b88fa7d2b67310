//! Format normalizer
//!
//! Boundary stage: everything after it may assume the canonical sample rate
//! and a stereo layout, and never re-validates either.

use crate::audio::decoder::SimpleDecoder;
use crate::audio::resampler::Resampler;
use crate::audio::types::AudioBuffer;
use crate::error::Result;
use std::f32::consts::FRAC_1_SQRT_2;
use std::path::Path;
use tracing::debug;

/// Channel count of the canonical layout
pub const CANONICAL_CHANNELS: usize = 2;

/// Decodes arbitrary input audio to the canonical format
#[derive(Debug, Clone)]
pub struct FormatNormalizer {
    target_sample_rate: u32,
}

impl FormatNormalizer {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Decode `input_path` to a canonical-rate stereo buffer
    ///
    /// # Errors
    /// `UnsupportedFormat` / `CorruptAudio` from the decoder.
    pub fn normalize(&self, input_path: &Path) -> Result<AudioBuffer> {
        let decoded = SimpleDecoder::decode_file(input_path)?;
        let source_channels = decoded.channels.len();
        let source_rate = decoded.sample_rate;

        let stereo = AudioBuffer::new(fold_to_stereo(decoded.channels), source_rate)?;
        let normalized = Resampler::resample(&stereo, self.target_sample_rate)?;

        debug!(
            source_channels,
            source_rate,
            frames = normalized.frames(),
            "Normalized {} to {}Hz stereo",
            input_path.display(),
            self.target_sample_rate
        );

        Ok(normalized)
    }
}

/// Fold any channel layout to stereo
///
/// - mono: duplicated to both sides
/// - stereo: unchanged
/// - more: front pair kept, remaining channels mixed into both sides at -3 dB,
///   then scaled down if the fold pushed the peak above full scale
fn fold_to_stereo(mut channels: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
    match channels.len() {
        1 => {
            let mono = channels.remove(0);
            vec![mono.clone(), mono]
        }
        2 => channels,
        _ => {
            let extras = channels.split_off(2);
            let mut right = channels.pop().unwrap_or_default();
            let mut left = channels.pop().unwrap_or_default();

            for extra in &extras {
                for (i, sample) in extra.iter().enumerate() {
                    left[i] += sample * FRAC_1_SQRT_2;
                    right[i] += sample * FRAC_1_SQRT_2;
                }
            }

            let peak = left
                .iter()
                .chain(right.iter())
                .fold(0.0f32, |acc, s| acc.max(s.abs()));
            if peak > 1.0 {
                let scale = 1.0 / peak;
                left.iter_mut().chain(right.iter_mut()).for_each(|s| *s *= scale);
            }

            vec![left, right]
        }
    }
}

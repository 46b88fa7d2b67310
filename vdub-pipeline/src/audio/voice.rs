//! Voice post-processing
//!
//! Brings synthesized speech to a fixed loudness so every language sits at the
//! same level over the instrumental bed.

use crate::audio::levels::{db_to_linear, peak, rms, SILENCE_THRESHOLD};
use crate::audio::types::AudioBuffer;
use tracing::debug;

/// Loudness target for synthesized voice
#[derive(Debug, Clone, Copy)]
pub struct VoiceLeveler {
    target_rms_dbfs: f32,
    peak_ceiling_dbfs: f32,
}

impl Default for VoiceLeveler {
    fn default() -> Self {
        Self::new(-20.0, -1.0)
    }
}

impl VoiceLeveler {
    pub fn new(target_rms_dbfs: f32, peak_ceiling_dbfs: f32) -> Self {
        Self {
            target_rms_dbfs,
            peak_ceiling_dbfs,
        }
    }

    /// Scale `voice` toward the RMS target without crossing the peak ceiling
    ///
    /// A single gain is applied to every sample, so the waveform shape is
    /// unchanged; the final clamp only guards against float rounding. Silent
    /// input is returned as-is. Applying this twice gives the same result as
    /// applying it once.
    pub fn normalize_voice(&self, voice: AudioBuffer) -> AudioBuffer {
        let current_rms = rms(&voice);
        let current_peak = peak(&voice);

        if current_peak < SILENCE_THRESHOLD || current_rms < SILENCE_THRESHOLD {
            debug!("Voice is silent, skipping level normalization");
            return voice;
        }

        let target_rms = db_to_linear(self.target_rms_dbfs);
        let ceiling = db_to_linear(self.peak_ceiling_dbfs);
        let gain = (target_rms / current_rms).min(ceiling / current_peak);

        debug!(
            current_rms,
            current_peak,
            gain,
            "Leveling voice to {} dBFS RMS (ceiling {} dBFS)",
            self.target_rms_dbfs,
            self.peak_ceiling_dbfs
        );

        voice.map_samples(|s| (s * gain).clamp(-ceiling, ceiling))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::levels::linear_to_db;

    fn tone(amplitude: f32, frames: usize) -> AudioBuffer {
        let samples = (0..frames)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16000.0).sin())
            .collect();
        AudioBuffer::mono(samples, 16000).unwrap()
    }

    #[test]
    fn test_quiet_voice_raised_to_target() {
        let leveler = VoiceLeveler::default();
        let output = leveler.normalize_voice(tone(0.01, 16000));
        assert!((linear_to_db(rms(&output)) + 20.0).abs() < 0.1);
    }

    #[test]
    fn test_peak_ceiling_wins_over_rms_target() {
        // Square-ish impulse train: low RMS, high crest factor
        let mut samples = vec![0.0f32; 16000];
        for i in (0..16000).step_by(400) {
            samples[i] = 0.05;
        }
        let leveler = VoiceLeveler::default();
        let output = leveler.normalize_voice(AudioBuffer::mono(samples, 16000).unwrap());

        let ceiling = db_to_linear(-1.0);
        assert!(peak(&output) <= ceiling + 1e-6);
        assert!((peak(&output) - ceiling).abs() < 1e-4);
    }

    #[test]
    fn test_silence_unchanged() {
        let silent = AudioBuffer::silent(1000, 2, 44100).unwrap();
        let output = VoiceLeveler::default().normalize_voice(silent.clone());
        assert_eq!(output, silent);
    }

    #[test]
    fn test_idempotent() {
        let leveler = VoiceLeveler::default();
        let once = leveler.normalize_voice(tone(0.7, 8000));
        let twice = leveler.normalize_voice(once.clone());

        for (a, b) in once.samples().zip(twice.samples()) {
            assert!((a - b).abs() < 1e-4);
        }
    }
}

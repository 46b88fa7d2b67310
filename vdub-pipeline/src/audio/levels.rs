//! Level measurement helpers (peak, RMS, dBFS)

use crate::audio::types::AudioBuffer;

/// Absolute level below which a buffer is treated as silent
pub const SILENCE_THRESHOLD: f32 = 1.0e-6;

/// Convert dBFS to linear amplitude
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Convert linear amplitude to dBFS (-inf for zero)
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Largest absolute sample over all channels
pub fn peak(buffer: &AudioBuffer) -> f32 {
    buffer.samples().fold(0.0f32, |acc, s| acc.max(s.abs()))
}

/// Root-mean-square over all channels
pub fn rms(buffer: &AudioBuffer) -> f32 {
    let count = buffer.frames() * buffer.channel_count();
    if count == 0 {
        return 0.0;
    }
    // Accumulate in f64, long buffers lose precision in f32
    let sum: f64 = buffer.samples().map(|s| (s as f64) * (s as f64)).sum();
    (sum / count as f64).sqrt() as f32
}

/// RMS of a plain slice
pub fn rms_of(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_conversion() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
        assert!((linear_to_db(0.5) + 6.0206).abs() < 1e-3);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }

    #[test]
    fn test_peak_and_rms() {
        let buffer = AudioBuffer::stereo(vec![0.5, -0.5], vec![-0.8, 0.0], 8000).unwrap();
        assert!((peak(&buffer) - 0.8).abs() < 1e-6);

        let square = AudioBuffer::mono(vec![0.5, -0.5, 0.5, -0.5], 8000).unwrap();
        assert!((rms(&square) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_buffer_levels() {
        let empty = AudioBuffer::mono(vec![], 8000).unwrap();
        assert_eq!(peak(&empty), 0.0);
        assert_eq!(rms(&empty), 0.0);
    }
}

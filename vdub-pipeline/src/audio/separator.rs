//! Source separator (vocal suppression)
//!
//! Produces an instrumental bed good enough to remix a new voice over, not a
//! studio-grade stem. Two strategies:
//!
//! - **Stereo:** centre-channel cancellation. The right channel is aligned to
//!   the left (bounded lag search) and level matched (RMS ratio),
//!   then subtracted, which removes content panned equally to both sides.
//!   The low end of the mid signal is added back so bass and kick survive.
//! - **Mono / dual-mono:** STFT band attenuation of the vocal formant range
//!   with overlap-add resynthesis.
//!
//! Both are length, sample-rate and channel-count preserving.

use crate::audio::types::AudioBuffer;
use crate::error::{PipelineError, Result};
use biquad::{Biquad, Coefficients, DirectForm2Transposed, Type, Q_BUTTERWORTH_F32};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use tracing::debug;

/// Separator tuning
#[derive(Debug, Clone)]
pub struct SeparatorSettings {
    /// Mid-signal content below this frequency is kept after cancellation
    pub bass_cutoff_hz: f32,
    /// Largest inter-channel offset searched when aligning R to L
    pub max_lag_ms: f32,
    /// Frames used for lag estimation (from the start of the track)
    pub analysis_frames: usize,
    /// Side/mid energy ratio below which a stereo buffer counts as mono
    pub dual_mono_ratio: f32,
    /// Vocal band lower edge (mono path)
    pub vocal_low_hz: f32,
    /// Vocal band upper edge (mono path)
    pub vocal_high_hz: f32,
    /// Linear gain applied inside the vocal band (mono path)
    pub vocal_band_gain: f32,
    /// STFT frame length (power of two)
    pub fft_size: usize,
    /// STFT hop length (fft_size / 4 for Hann overlap-add)
    pub hop_size: usize,
}

impl Default for SeparatorSettings {
    fn default() -> Self {
        Self {
            bass_cutoff_hz: 150.0,
            max_lag_ms: 1.0,
            analysis_frames: 1 << 16,
            dual_mono_ratio: 1.0e-4,
            vocal_low_hz: 250.0,
            vocal_high_hz: 4000.0,
            vocal_band_gain: 0.2,
            fft_size: 2048,
            hop_size: 512,
        }
    }
}

/// Derives an instrumental track from normalized PCM
#[derive(Debug, Clone, Default)]
pub struct SourceSeparator {
    settings: SeparatorSettings,
}

impl SourceSeparator {
    pub fn new(settings: SeparatorSettings) -> Self {
        Self { settings }
    }

    /// Suppress vocals, keep the backing track
    ///
    /// # Errors
    /// `InvalidAudioState` if the output buffer cannot be built (only possible
    /// through a broken invariant upstream) or the filter parameters exceed
    /// Nyquist for this sample rate.
    pub fn separate_instrumental(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        if input.is_empty() {
            return Ok(input.clone());
        }

        if input.channel_count() == 2 && !self.is_dual_mono(input) {
            debug!(frames = input.frames(), "Separating with centre cancellation");
            self.cancel_centre(input)
        } else {
            debug!(frames = input.frames(), "Separating with vocal band suppression");
            let mono = input.to_mono();
            let suppressed = self.suppress_vocal_band(mono.channel(0), input.sample_rate());
            AudioBuffer::new(vec![suppressed; input.channel_count()], input.sample_rate())
        }
    }

    /// True when both channels carry (almost) the same signal
    fn is_dual_mono(&self, input: &AudioBuffer) -> bool {
        let (left, right) = (input.channel(0), input.channel(1));
        let mut mid_energy = 0.0f64;
        let mut side_energy = 0.0f64;
        for (l, r) in left.iter().zip(right) {
            let mid = (*l + *r) as f64 * 0.5;
            let side = (*l - *r) as f64 * 0.5;
            mid_energy += mid * mid;
            side_energy += side * side;
        }
        if mid_energy <= f64::EPSILON {
            // Silence, or pure side content: nothing in the centre to cancel
            return side_energy <= f64::EPSILON;
        }
        (side_energy / mid_energy) < self.settings.dual_mono_ratio as f64
    }

    fn cancel_centre(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        let sample_rate = input.sample_rate();
        let (left, right) = (input.channel(0), input.channel(1));
        let frames = input.frames();

        let max_lag = ((self.settings.max_lag_ms / 1000.0) * sample_rate as f32).round() as isize;
        let lag = estimate_lag(left, right, max_lag, self.settings.analysis_frames);
        let aligned: Vec<f32> = (0..frames)
            .map(|i| {
                let j = i as isize + lag;
                if j >= 0 && (j as usize) < frames {
                    right[j as usize]
                } else {
                    0.0
                }
            })
            .collect();
        let gain = level_match_gain(left, &aligned);

        debug!(lag, gain, "Centre cancellation alignment");

        let mid: Vec<f32> = left
            .iter()
            .zip(&aligned)
            .map(|(l, r)| 0.5 * (l + gain * r))
            .collect();
        let bass = lowpass(&mid, sample_rate, self.settings.bass_cutoff_hz)?;

        let mut out_left = Vec::with_capacity(frames);
        let mut out_right = Vec::with_capacity(frames);
        for i in 0..frames {
            let side = 0.5 * (left[i] - gain * aligned[i]);
            out_left.push((bass[i] + side).clamp(-1.0, 1.0));
            out_right.push((bass[i] - side).clamp(-1.0, 1.0));
        }

        AudioBuffer::stereo(out_left, out_right, sample_rate)
    }

    /// STFT overlap-add with the vocal band attenuated
    fn suppress_vocal_band(&self, samples: &[f32], sample_rate: u32) -> Vec<f32> {
        let n = self.settings.fft_size;
        let hop = self.settings.hop_size;
        let frames = samples.len();

        let window: Vec<f32> = (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
            .collect();
        let gains = band_gains(
            n,
            sample_rate,
            self.settings.vocal_low_hz,
            self.settings.vocal_high_hz,
            self.settings.vocal_band_gain,
        );

        // Pad so every input sample is covered by a full set of overlapping frames
        let padded_len = frames + 2 * n;
        let mut padded = vec![0.0f32; padded_len];
        padded[n..n + frames].copy_from_slice(samples);

        let mut output = vec![0.0f32; padded_len];
        let mut norm = vec![0.0f32; padded_len];

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let ifft = planner.plan_fft_inverse(n);
        let mut spectrum = vec![Complex::new(0.0f32, 0.0); n];

        let mut start = 0;
        while start + n <= padded_len {
            for i in 0..n {
                spectrum[i] = Complex::new(padded[start + i] * window[i], 0.0);
            }
            fft.process(&mut spectrum);
            for (bin, gain) in spectrum.iter_mut().zip(&gains) {
                *bin *= *gain;
            }
            ifft.process(&mut spectrum);

            // rustfft does not normalize the inverse transform
            let scale = 1.0 / n as f32;
            for i in 0..n {
                output[start + i] += spectrum[i].re * scale * window[i];
                norm[start + i] += window[i] * window[i];
            }
            start += hop;
        }

        (n..n + frames)
            .map(|i| {
                let value = if norm[i] > 1.0e-8 { output[i] / norm[i] } else { 0.0 };
                value.clamp(-1.0, 1.0)
            })
            .collect()
    }
}

/// Offset of `right` relative to `left` maximizing their correlation
///
/// Searches `-max_lag..=max_lag` over the first `window` frames.
fn estimate_lag(left: &[f32], right: &[f32], max_lag: isize, window: usize) -> isize {
    let len = left.len().min(window) as isize;
    let mut best_lag = 0isize;
    let mut best_score = f64::NEG_INFINITY;

    for lag in -max_lag..=max_lag {
        let mut score = 0.0f64;
        for i in 0..len {
            let j = i + lag;
            if j >= 0 && j < left.len() as isize {
                score += left[i as usize] as f64 * right[j as usize] as f64;
            }
        }
        // Prefer the smallest offset on ties (silence, identical content)
        if score > best_score + 1.0e-12 || (lag == 0 && (score - best_score).abs() <= 1.0e-12) {
            best_score = score;
            best_lag = lag;
        }
    }

    best_lag
}

/// Gain bringing `right` to the level of `left` (RMS ratio), bounded
///
/// Balanced mixes give 1.0; a globally attenuated channel is scaled back up.
fn level_match_gain(left: &[f32], right: &[f32]) -> f32 {
    let (mut left_power, mut right_power) = (0.0f64, 0.0f64);
    for (l, r) in left.iter().zip(right) {
        left_power += *l as f64 * *l as f64;
        right_power += *r as f64 * *r as f64;
    }
    if left_power <= f64::EPSILON || right_power <= f64::EPSILON {
        return 1.0;
    }
    ((left_power / right_power).sqrt() as f32).clamp(0.25, 4.0)
}

/// Butterworth low-pass
///
/// biquad 0.5 expects the cutoff as a fraction of Nyquist (`2·fc/fs`);
/// `from_params` divides by `2·fs` instead and lands two octaves low.
fn lowpass(samples: &[f32], sample_rate: u32, cutoff_hz: f32) -> Result<Vec<f32>> {
    let normalized = 2.0 * cutoff_hz / sample_rate as f32;
    if !(normalized > 0.0 && normalized < 1.0) {
        return Err(PipelineError::InvalidAudioState(format!(
            "Low-pass cutoff {} Hz outside (0, Nyquist) at {} Hz",
            cutoff_hz, sample_rate
        )));
    }
    let coeffs = Coefficients::<f32>::from_normalized_params(Type::LowPass, normalized, Q_BUTTERWORTH_F32)
        .map_err(|e| PipelineError::InvalidAudioState(format!("Invalid low-pass parameters: {:?}", e)))?;

    let mut filter = DirectForm2Transposed::<f32>::new(coeffs);
    Ok(samples.iter().map(|s| filter.run(*s)).collect())
}

/// Per-bin gain: `band_gain` inside [low, high], 1.0 outside, raised-cosine
/// transitions one octave wide on the outside of each edge
fn band_gains(fft_size: usize, sample_rate: u32, low_hz: f32, high_hz: f32, band_gain: f32) -> Vec<f32> {
    let bin_hz = sample_rate as f32 / fft_size as f32;
    (0..fft_size)
        .map(|bin| {
            // Mirror the upper half so the spectrum stays conjugate-symmetric
            let k = if bin <= fft_size / 2 { bin } else { fft_size - bin };
            let freq = k as f32 * bin_hz;
            let depth = if freq >= low_hz && freq <= high_hz {
                1.0
            } else if freq < low_hz && freq > low_hz / 2.0 {
                let t = (freq - low_hz / 2.0) / (low_hz / 2.0);
                0.5 - 0.5 * (PI * t).cos()
            } else if freq > high_hz && freq < high_hz * 2.0 {
                let t = (freq - high_hz) / high_hz;
                0.5 + 0.5 * (PI * t).cos()
            } else {
                0.0
            };
            1.0 - depth * (1.0 - band_gain)
        })
        .collect()
}

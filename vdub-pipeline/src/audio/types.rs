//! Audio data types
//!
//! [`AudioBuffer`] is the unit every numeric stage consumes and produces.
//! Stages never mutate a buffer they were given; they build a new one.

use crate::error::{PipelineError, Result};

/// Decoded PCM audio
///
/// Planar f32 samples, nominally in [-1.0, 1.0]. Fields are private so the
/// invariants checked in [`AudioBuffer::new`] hold for every instance:
/// - 1 or 2 channels
/// - all channels have the same length
/// - sample rate is non-zero
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer from planar channel data
    ///
    /// # Errors
    /// `InvalidAudioState` if the channel count is not 1 or 2, the channels
    /// differ in length, or the sample rate is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() || channels.len() > 2 {
            return Err(PipelineError::InvalidAudioState(format!(
                "channel count must be 1 or 2, got {}",
                channels.len()
            )));
        }
        if sample_rate == 0 {
            return Err(PipelineError::InvalidAudioState(
                "sample rate must be non-zero".to_string(),
            ));
        }
        let frames = channels[0].len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != frames)
        {
            return Err(PipelineError::InvalidAudioState(format!(
                "channel {} has {} samples, channel 0 has {}",
                index,
                channel.len(),
                frames
            )));
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Single-channel buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Two-channel buffer
    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![left, right], sample_rate)
    }

    /// All-zero buffer of the given shape
    pub fn silent(frames: usize, channel_count: usize, sample_rate: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; frames]; channel_count], sample_rate)
    }

    /// Build from interleaved samples ([L, R, L, R, ...])
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(PipelineError::InvalidAudioState(
                "channel count must be 1 or 2, got 0".to_string(),
            ));
        }
        let frames = samples.len() / channel_count;
        let mut planar = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in planar.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Self::new(planar, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Iterate over every sample of every channel
    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.channels.iter().flat_map(|c| c.iter().copied())
    }

    /// Interleaved copy ([L, R, L, R, ...])
    pub fn interleaved(&self) -> Vec<f32> {
        let mut output = Vec::with_capacity(self.frames() * self.channel_count());
        for frame in 0..self.frames() {
            for channel in &self.channels {
                output.push(channel[frame]);
            }
        }
        output
    }

    /// Average of all channels
    pub fn to_mono(&self) -> AudioBuffer {
        if self.channel_count() == 1 {
            return self.clone();
        }
        let scale = 1.0 / self.channel_count() as f32;
        let mixed = (0..self.frames())
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() * scale)
            .collect();
        AudioBuffer {
            channels: vec![mixed],
            sample_rate: self.sample_rate,
        }
    }

    /// Duplicate a mono channel to both sides; stereo is returned as-is
    pub fn to_stereo(&self) -> AudioBuffer {
        if self.channel_count() == 2 {
            return self.clone();
        }
        AudioBuffer {
            channels: vec![self.channels[0].clone(), self.channels[0].clone()],
            sample_rate: self.sample_rate,
        }
    }

    /// Apply `f` to every sample, producing a new buffer of the same shape
    pub fn map_samples(&self, f: impl Fn(f32) -> f32) -> AudioBuffer {
        AudioBuffer {
            channels: self
                .channels
                .iter()
                .map(|c| c.iter().map(|s| f(*s)).collect())
                .collect(),
            sample_rate: self.sample_rate,
        }
    }
}

//! Mixer
//!
//! Sums the leveled voice over the instrumental bed. Output always has the
//! configured sample rate, the instrumental's channel layout, and the length
//! of the longer input; the shorter one is padded with silence.

use crate::audio::resampler::Resampler;
use crate::audio::types::AudioBuffer;
use crate::error::Result;
use tracing::debug;

/// Combines instrumental and voice into the final program
#[derive(Debug, Clone)]
pub struct Mixer {
    output_sample_rate: u32,
}

impl Mixer {
    pub fn new(output_sample_rate: u32) -> Self {
        Self { output_sample_rate }
    }

    pub fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate
    }

    /// Mix `voice` over `instrumental`
    ///
    /// Both inputs are brought to the output rate, the voice is upmixed to the
    /// instrumental's layout, and the sum is hard-limited to [-1.0, 1.0].
    ///
    /// # Errors
    /// `InvalidAudioState` if resampling fails.
    pub fn mix(&self, instrumental: &AudioBuffer, voice: &AudioBuffer) -> Result<AudioBuffer> {
        let bed = Resampler::resample(instrumental, self.output_sample_rate)?;
        let mut voice = Resampler::resample(voice, self.output_sample_rate)?;
        if voice.channel_count() != bed.channel_count() {
            voice = if bed.channel_count() == 2 {
                voice.to_stereo()
            } else {
                voice.to_mono()
            };
        }

        let frames = bed.frames().max(voice.frames());
        debug!(
            instrumental_frames = bed.frames(),
            voice_frames = voice.frames(),
            frames,
            "Mixing voice over instrumental"
        );

        let mut clipped = 0usize;
        let channels: Vec<Vec<f32>> = bed
            .channels()
            .iter()
            .zip(voice.channels())
            .map(|(bed_channel, voice_channel)| {
                (0..frames)
                    .map(|i| {
                        let sum = bed_channel.get(i).copied().unwrap_or(0.0)
                            + voice_channel.get(i).copied().unwrap_or(0.0);
                        if sum.abs() > 1.0 {
                            clipped += 1;
                        }
                        sum.clamp(-1.0, 1.0)
                    })
                    .collect()
            })
            .collect();

        if clipped > 0 {
            debug!(clipped, "Limiter engaged on mixed output");
        }

        AudioBuffer::new(channels, self.output_sample_rate)
    }
}

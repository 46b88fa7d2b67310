//! Audio Test Fixture Generator
//!
//! Deterministic tone fixtures, as files, in-memory WAV bytes or buffers

use std::io::Cursor;
use std::path::{Path, PathBuf};
use vdub_pipeline::audio::AudioBuffer;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct ToneConfig {
    pub frequency_hz: f32,
    pub amplitude: f32,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            amplitude: 0.3,
            duration_seconds: 1.0,
            sample_rate: 44100,
            channels: 2,
        }
    }
}

impl ToneConfig {
    fn frames(&self) -> usize {
        (self.duration_seconds * self.sample_rate as f64) as usize
    }

    fn sample(&self, i: usize) -> f32 {
        let t = i as f32 / self.sample_rate as f32;
        self.amplitude * (2.0 * std::f32::consts::PI * self.frequency_hz * t).sin()
    }

    fn spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

fn write_tone<W: std::io::Write + std::io::Seek>(
    writer: &mut hound::WavWriter<W>,
    config: &ToneConfig,
) -> hound::Result<()> {
    for i in 0..config.frames() {
        let sample = (config.sample(i) * i16::MAX as f32) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }
    Ok(())
}

/// Generate a test WAV file with the specified tone
pub fn generate_test_wav(path: &Path, config: &ToneConfig) -> anyhow::Result<PathBuf> {
    let mut writer = hound::WavWriter::create(path, config.spec())?;
    write_tone(&mut writer, config)?;
    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Same as [`generate_test_wav`], in memory
pub fn sine_wav_bytes(config: &ToneConfig) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, config.spec()).unwrap();
        write_tone(&mut writer, config).unwrap();
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Tone as an [`AudioBuffer`] (1 or 2 channels)
pub fn sine_buffer(config: &ToneConfig) -> AudioBuffer {
    let samples: Vec<f32> = (0..config.frames()).map(|i| config.sample(i)).collect();
    if config.channels == 1 {
        AudioBuffer::mono(samples, config.sample_rate).unwrap()
    } else {
        AudioBuffer::stereo(samples.clone(), samples, config.sample_rate).unwrap()
    }
}

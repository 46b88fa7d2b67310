//! WAV helpers (hound)
//!
//! 16-bit PCM is the interchange format with the encoder subprocess and the
//! speech service.

use crate::audio::types::AudioBuffer;
use crate::error::{PipelineError, Result};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

fn spec_for(buffer: &AudioBuffer) -> hound::WavSpec {
    hound::WavSpec {
        channels: buffer.channel_count() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn write_samples<W: Write + Seek>(writer: &mut hound::WavWriter<W>, buffer: &AudioBuffer) -> hound::Result<()> {
    for sample in buffer.interleaved() {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value)?;
    }
    Ok(())
}

/// Write `buffer` to `path` as 16-bit PCM WAV
pub fn write_wav(path: &Path, buffer: &AudioBuffer) -> Result<()> {
    let mut writer = hound::WavWriter::create(path, spec_for(buffer)).map_err(|e| {
        PipelineError::Workspace(format!("Failed to create {}: {}", path.display(), e))
    })?;
    write_samples(&mut writer, buffer)
        .and_then(|_| writer.finalize())
        .map_err(|e| PipelineError::Workspace(format!("Failed to write {}: {}", path.display(), e)))
}

/// Serialize `buffer` to an in-memory WAV file
pub fn encode_wav_bytes(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec_for(buffer))
            .map_err(|e| PipelineError::Encoding(format!("WAV header: {}", e)))?;
        write_samples(&mut writer, buffer)
            .and_then(|_| writer.finalize())
            .map_err(|e| PipelineError::Encoding(format!("WAV body: {}", e)))?;
    }
    Ok(cursor.into_inner())
}

/// Parse a WAV file (any integer width or 32-bit float) into an [`AudioBuffer`]
///
/// Sources with more than two channels are averaged down to mono.
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<AudioBuffer> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::CorruptAudio(format!("Invalid WAV: {}", e)))?;
    read_buffer(reader)
}

fn read_buffer<R: Read>(reader: hound::WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<hound::Result<_>>()
            .map_err(|e| PipelineError::CorruptAudio(format!("WAV samples: {}", e)))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<hound::Result<_>>()
                .map_err(|e| PipelineError::CorruptAudio(format!("WAV samples: {}", e)))?
        }
    };

    if channels <= 2 {
        return AudioBuffer::from_interleaved(&interleaved, channels, spec.sample_rate);
    }

    let scale = 1.0 / channels as f32;
    let mono = interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect();
    AudioBuffer::mono(mono, spec.sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_preserve_layout_and_rate() {
        let buffer = AudioBuffer::stereo(vec![0.5, -0.25, 0.0], vec![0.0, 0.25, -1.0], 22050).unwrap();
        let decoded = decode_wav_bytes(&encode_wav_bytes(&buffer).unwrap()).unwrap();

        assert_eq!(decoded.sample_rate(), 22050);
        assert_eq!(decoded.channel_count(), 2);
        assert_eq!(decoded.frames(), 3);
        for (a, b) in buffer.samples().zip(decoded.samples()) {
            assert!((a - b).abs() < 1.0e-3);
        }
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let result = decode_wav_bytes(b"definitely not a wav file");
        assert!(matches!(result, Err(PipelineError::CorruptAudio(_))));
    }

    #[test]
    fn test_write_wav_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let buffer = AudioBuffer::mono(vec![0.1; 100], 16000).unwrap();

        write_wav(&path, &buffer).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 100);
    }
}

//! Audio decoder using symphonia
//!
//! Decodes any container/codec symphonia knows (MP3, WAV, FLAC, AAC/M4A,
//! Vorbis/OGG, ...) to planar f32 PCM at the source sample rate and channel
//! layout. Layout and rate normalisation happen in the format normalizer.

use crate::error::{PipelineError, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Raw decoded audio at the source's native format
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// One Vec per source channel, all of equal length
    pub channels: Vec<Vec<f32>>,
    /// Native sample rate
    pub sample_rate: u32,
    /// Packets dropped because the codec rejected them
    pub skipped_packets: usize,
}

/// Simple whole-file decoder using symphonia.
pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Decode an entire audio file to planar f32 samples.
    ///
    /// # Errors
    /// - `UnsupportedFormat`: probe failed, no audio track, or no decoder for the codec
    /// - `CorruptAudio`: the stream broke partway or nothing could be decoded
    /// - `Workspace`: the file could not be opened
    pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
        debug!("Decoding entire file: {}", path.display());

        let file = std::fs::File::open(path).map_err(|e| {
            PipelineError::Workspace(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| PipelineError::UnsupportedFormat(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        // Get the first decodable audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| PipelineError::UnsupportedFormat("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| PipelineError::UnsupportedFormat(format!("Failed to create decoder: {}", e)))?;

        let mut sample_rate = codec_params.sample_rate;
        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream");
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    // Chained stream with a new layout; keep the first one
                    debug!("Stream reset required, stopping after first segment");
                    break;
                }
                Err(e) => {
                    return Err(PipelineError::CorruptAudio(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping undecodable packet: {}", e);
                    skipped_packets += 1;
                    continue;
                }
                Err(e) => {
                    return Err(PipelineError::CorruptAudio(format!("Decode failed: {}", e)));
                }
            };

            let spec = *decoded.spec();
            let frames = decoded.frames();
            if frames == 0 {
                continue;
            }

            let channel_count = spec.channels.count();
            if channels.is_empty() {
                channels = vec![Vec::new(); channel_count];
                sample_rate = sample_rate.or(Some(spec.rate));
            } else if channels.len() != channel_count {
                return Err(PipelineError::CorruptAudio(format!(
                    "Channel count changed mid-stream ({} → {})",
                    channels.len(),
                    channel_count
                )));
            }

            // Planar copy: one contiguous block of `frames` samples per channel
            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_planar_ref(decoded);
            for (channel, plane) in channels
                .iter_mut()
                .zip(sample_buf.samples().chunks_exact(frames))
            {
                channel.extend_from_slice(plane);
            }
        }

        let frames = channels.first().map(Vec::len).unwrap_or(0);
        if frames == 0 {
            return Err(PipelineError::CorruptAudio(format!(
                "No audio frames could be decoded ({} packets skipped)",
                skipped_packets
            )));
        }

        let sample_rate = sample_rate
            .ok_or_else(|| PipelineError::CorruptAudio("Sample rate not found".to_string()))?;

        debug!(
            "Decoded {} frames, {} channels at {}Hz ({} packets skipped)",
            frames,
            channels.len(),
            sample_rate,
            skipped_packets
        );

        Ok(DecodedAudio {
            channels,
            sample_rate,
            skipped_packets,
        })
    }
}

//! Output encoding
//!
//! The mixed program is written to the workspace as WAV and handed to an
//! external ffmpeg (libmp3lame) process. Output bytes are only read back once
//! the process has exited successfully, so a partial file is never returned.

use crate::audio::types::AudioBuffer;
use crate::audio::wav::write_wav;
use crate::error::{PipelineError, Result};
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Encodes a finished [`AudioBuffer`] into deliverable bytes
#[async_trait]
pub trait AudioEncoder: Send + Sync {
    /// MIME type of the produced bytes
    fn content_type(&self) -> &'static str;

    /// Extension used for the file inside the workspace
    fn file_extension(&self) -> &'static str;

    /// Encode `audio`, using `workspace` for intermediate files
    async fn encode(&self, audio: &AudioBuffer, workspace: &Workspace) -> Result<Vec<u8>>;
}

/// MP3 encoder backed by the ffmpeg command-line tool
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg_path: PathBuf,
    bitrate_kbps: u32,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, bitrate_kbps: u32) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            bitrate_kbps,
        }
    }

    /// Check that the configured ffmpeg binary can be executed
    pub async fn is_available(&self) -> bool {
        let available = Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false);

        debug!(
            command = %self.ffmpeg_path.display(),
            available,
            "ffmpeg availability check"
        );
        available
    }
}

#[async_trait]
impl AudioEncoder for FfmpegEncoder {
    fn content_type(&self) -> &'static str {
        "audio/mpeg"
    }

    fn file_extension(&self) -> &'static str {
        "mp3"
    }

    async fn encode(&self, audio: &AudioBuffer, workspace: &Workspace) -> Result<Vec<u8>> {
        let wav_path = workspace.file("mix.wav");
        let out_path = workspace.file(&format!("dubbed.{}", self.file_extension()));

        let mix = audio.clone();
        let wav_target = wav_path.clone();
        tokio::task::spawn_blocking(move || write_wav(&wav_target, &mix)).await??;

        debug!(
            bitrate_kbps = self.bitrate_kbps,
            "Encoding {} -> {}",
            wav_path.display(),
            out_path.display()
        );

        let output = Command::new(&self.ffmpeg_path)
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-y")
            .arg("-i")
            .arg(&wav_path)
            .args(["-codec:a", "libmp3lame"])
            .arg("-b:a")
            .arg(format!("{}k", self.bitrate_kbps))
            .arg(&out_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PipelineError::Encoding(format!(
                    "Failed to run {}: {}",
                    self.ffmpeg_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("ffmpeg exited with {}: {}", output.status, stderr.trim());
            return Err(PipelineError::Encoding(format!(
                "ffmpeg exited with {}",
                output.status
            )));
        }

        let bytes = tokio::fs::read(&out_path).await.map_err(|e| {
            PipelineError::Encoding(format!("Failed to read {}: {}", out_path.display(), e))
        })?;
        if bytes.is_empty() {
            return Err(PipelineError::Encoding("ffmpeg produced an empty file".to_string()));
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_encoding_error() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::acquire(root.path()).unwrap();
        let encoder = FfmpegEncoder::new("/nonexistent/ffmpeg-binary", 192);
        let audio = AudioBuffer::silent(100, 2, 44100).unwrap();

        assert!(!encoder.is_available().await);
        let result = encoder.encode(&audio, &workspace).await;
        assert!(matches!(result, Err(PipelineError::Encoding(_))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_mix_written_before_encoder_runs() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::acquire(root.path()).unwrap();
        let encoder = FfmpegEncoder::new("/nonexistent/ffmpeg-binary", 192);
        let audio = AudioBuffer::silent(4410, 2, 44100).unwrap();

        let _ = encoder.encode(&audio, &workspace).await;

        let written = std::fs::read(workspace.file("mix.wav")).unwrap();
        let decoded = crate::audio::wav::decode_wav_bytes(&written).unwrap();
        assert_eq!(decoded.frames(), 4410);
        assert_eq!(decoded.channel_count(), 2);
    }

    #[test]
    fn test_metadata() {
        let encoder = FfmpegEncoder::new("ffmpeg", 192);
        assert_eq!(encoder.content_type(), "audio/mpeg");
        assert_eq!(encoder.file_extension(), "mp3");
    }
}

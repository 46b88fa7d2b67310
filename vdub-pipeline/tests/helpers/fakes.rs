//! In-memory collaborators and encoder that count their invocations

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vdub_common::Language;
use vdub_pipeline::audio::wav::encode_wav_bytes;
use vdub_pipeline::audio::{AudioBuffer, AudioEncoder};
use vdub_pipeline::collaborators::{Synthesizer, Transcriber, Transcript, Translator};
use vdub_pipeline::{Collaborators, PipelineError, Workspace};

use super::audio_generator::{sine_buffer, ToneConfig};

/// Recognizer returning a fixed transcript
pub struct FakeTranscriber {
    pub text: String,
    pub detected_language: Option<String>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl Default for FakeTranscriber {
    fn default() -> Self {
        Self {
            text: "hello and welcome to the show".to_string(),
            detected_language: Some("en".to_string()),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &AudioBuffer) -> anyhow::Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("recognizer offline");
        }
        assert!(!audio.is_empty(), "transcriber received empty audio");
        Ok(Transcript {
            text: self.text.clone(),
            detected_language: self.detected_language.clone(),
        })
    }
}

/// Translator tagging the text with the language pair
#[derive(Default)]
pub struct FakeTranslator {
    pub empty_output: bool,
    pub calls: AtomicUsize,
    pub pairs: Mutex<Vec<(Language, Language)>>,
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pairs.lock().unwrap().push((source, target));
        if self.empty_output {
            return Ok(String::new());
        }
        Ok(format!("[{}->{}] {}", source, target, text))
    }
}

/// Synthesizer producing a mono 16 kHz tone
pub struct FakeSynthesizer {
    pub duration_seconds: f64,
    pub delay: Option<Duration>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl Default for FakeSynthesizer {
    fn default() -> Self {
        Self {
            duration_seconds: 0.5,
            delay: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str, _language: Language) -> anyhow::Result<AudioBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("voice model crashed");
        }
        Ok(sine_buffer(&ToneConfig {
            frequency_hz: 220.0,
            amplitude: 0.05,
            duration_seconds: self.duration_seconds,
            sample_rate: 16000,
            channels: 1,
        }))
    }
}

/// The three fakes, kept reachable for call-count assertions
#[derive(Clone, Default)]
pub struct FakeCollaborators {
    pub transcriber: Arc<FakeTranscriber>,
    pub translator: Arc<FakeTranslator>,
    pub synthesizer: Arc<FakeSynthesizer>,
}

impl FakeCollaborators {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            transcriber: self.transcriber.clone(),
            translator: self.translator.clone(),
            synthesizer: self.synthesizer.clone(),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.transcriber.calls.load(Ordering::SeqCst)
            + self.translator.calls.load(Ordering::SeqCst)
            + self.synthesizer.calls.load(Ordering::SeqCst)
    }
}

/// Encoder emitting WAV, so tests do not need ffmpeg
#[derive(Default)]
pub struct WavTestEncoder {
    pub fail: bool,
    /// Workspace directories seen by `encode`
    pub workspaces: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl AudioEncoder for WavTestEncoder {
    fn content_type(&self) -> &'static str {
        "audio/wav"
    }

    fn file_extension(&self) -> &'static str {
        "wav"
    }

    async fn encode(&self, audio: &AudioBuffer, workspace: &Workspace) -> Result<Vec<u8>, PipelineError> {
        self.workspaces.lock().unwrap().push(workspace.path().to_path_buf());
        if self.fail {
            return Err(PipelineError::Encoding("test encoder failure".to_string()));
        }
        let bytes = encode_wav_bytes(audio)?;
        std::fs::write(workspace.file("dubbed.wav"), &bytes)
            .map_err(|e| PipelineError::Encoding(e.to_string()))?;
        Ok(bytes)
    }
}

//! Speech collaborators: recognition, translation, synthesis
//!
//! The pipeline only depends on these traits. Implementations are expected
//! to be expensive to initialize and cheap to call, so they load their models
//! through [`registry::ModelRegistry`] on first use.
//!
//! Errors are `anyhow` at this seam; the orchestrator maps them onto the
//! matching [`crate::error::PipelineError`] stage variant.

pub mod http;
pub mod registry;

use crate::audio::AudioBuffer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vdub_common::Language;

pub use http::{HttpSynthesizer, HttpTranscriber, HttpTranslator, SpeechServiceClient};
pub use registry::ModelRegistry;

/// Output of speech recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Language code reported by the recognizer, if any
    #[serde(default)]
    pub detected_language: Option<String>,
}

/// Speech recognition
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &AudioBuffer) -> anyhow::Result<Transcript>;
}

/// Text translation between two supported languages
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language) -> anyhow::Result<String>;
}

/// Text-to-speech in a supported language
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: Language) -> anyhow::Result<AudioBuffer>;
}

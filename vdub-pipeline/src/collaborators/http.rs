//! HTTP adapters for a speech-model service
//!
//! The service hosts the ASR, translation and TTS models. Models are loaded
//! on the service with `POST /v1/models`, which returns a handle; handles are
//! cached process-wide in [`MODELS`] so concurrent first requests trigger a
//! single load.
//!
//! | Endpoint            | Request                         | Response              |
//! |---------------------|---------------------------------|-----------------------|
//! | `POST /v1/models`   | `{"model_id"}`                  | `{"handle"}`          |
//! | `POST /v1/transcribe` | WAV body (16 kHz mono), `?model=` | `{"text", "detected_language"}` |
//! | `POST /v1/translate`  | `{"model", "text"}`           | `{"text"}`            |
//! | `POST /v1/synthesize` | `{"model", "text"}`           | WAV body              |

use super::registry::ModelRegistry;
use super::{Synthesizer, Transcriber, Transcript, Translator};
use crate::audio::wav::{decode_wav_bytes, encode_wav_bytes};
use crate::audio::{AudioBuffer, Resampler};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use vdub_common::language::ASR_MODEL_ID;
use vdub_common::Language;

const USER_AGENT: &str = concat!("vdub/", env!("CARGO_PKG_VERSION"));

/// Sample rate the recognizer expects
pub const ASR_SAMPLE_RATE: u32 = 16_000;

/// Model loaded on the speech service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteModel {
    pub model_id: String,
    pub handle: String,
}

/// Process-wide model handles, keyed by `<base_url>#<model_id>`
static MODELS: Lazy<ModelRegistry<RemoteModel>> = Lazy::new(ModelRegistry::new);

#[derive(Serialize)]
struct LoadModelRequest<'a> {
    model_id: &'a str,
}

#[derive(Deserialize)]
struct LoadModelResponse {
    handle: String,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    model: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct TextResponse {
    text: String,
}

/// Client for the speech-model service
#[derive(Debug, Clone)]
pub struct SpeechServiceClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl SpeechServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Handle for `model_id`, loading it on the service on first use
    pub async fn model(&self, model_id: &str) -> anyhow::Result<Arc<RemoteModel>> {
        let key = format!("{}#{}", self.base_url, model_id);
        MODELS
            .get_or_load(&key, || self.load_model(model_id))
            .await
    }

    async fn load_model(&self, model_id: &str) -> anyhow::Result<RemoteModel> {
        let response = self
            .http_client
            .post(self.url("/v1/models"))
            .json(&LoadModelRequest { model_id })
            .send()
            .await
            .with_context(|| format!("Model load request for {} failed", model_id))?;

        let response = check_status(response, "model load").await?;
        let body: LoadModelResponse = response
            .json()
            .await
            .context("Invalid model load response")?;

        Ok(RemoteModel {
            model_id: model_id.to_string(),
            handle: body.handle,
        })
    }

    async fn transcribe_wav(&self, model: &RemoteModel, wav: Vec<u8>) -> anyhow::Result<Transcript> {
        let response = self
            .http_client
            .post(self.url("/v1/transcribe"))
            .query(&[("model", model.handle.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(wav)
            .send()
            .await
            .context("Transcription request failed")?;

        let response = check_status(response, "transcription").await?;
        response
            .json::<Transcript>()
            .await
            .context("Invalid transcription response")
    }

    async fn translate_text(&self, model: &RemoteModel, text: &str) -> anyhow::Result<String> {
        let response = self
            .http_client
            .post(self.url("/v1/translate"))
            .json(&TextRequest {
                model: &model.handle,
                text,
            })
            .send()
            .await
            .context("Translation request failed")?;

        let response = check_status(response, "translation").await?;
        let body: TextResponse = response
            .json()
            .await
            .context("Invalid translation response")?;
        Ok(body.text)
    }

    async fn synthesize_wav(&self, model: &RemoteModel, text: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .http_client
            .post(self.url("/v1/synthesize"))
            .json(&TextRequest {
                model: &model.handle,
                text,
            })
            .send()
            .await
            .context("Synthesis request failed")?;

        let response = check_status(response, "synthesis").await?;
        let bytes = response.bytes().await.context("Failed to read synthesized audio")?;
        Ok(bytes.to_vec())
    }
}

async fn check_status(response: reqwest::Response, operation: &str) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), body = %error_text, "Speech service error");
    Err(anyhow!(
        "Speech service {} returned {}: {}",
        operation,
        status.as_u16(),
        error_text
    ))
}

/// Speech recognition through the service
#[derive(Debug, Clone)]
pub struct HttpTranscriber {
    client: Arc<SpeechServiceClient>,
}

impl HttpTranscriber {
    pub fn new(client: Arc<SpeechServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &AudioBuffer) -> anyhow::Result<Transcript> {
        let model = self.client.model(ASR_MODEL_ID).await?;

        let mono = audio.to_mono();
        let wav = tokio::task::spawn_blocking(move || asr_wav(&mono))
            .await
            .context("ASR audio preparation task failed")??;
        tracing::debug!(
            model = %model.model_id,
            bytes = wav.len(),
            "Sending audio for transcription"
        );

        self.client.transcribe_wav(&model, wav).await
    }
}

/// 16 kHz mono WAV bytes for the recognizer
fn asr_wav(mono: &AudioBuffer) -> anyhow::Result<Vec<u8>> {
    let speech = Resampler::resample(mono, ASR_SAMPLE_RATE)?;
    Ok(encode_wav_bytes(&speech)?)
}

/// Translation through the service
#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: Arc<SpeechServiceClient>,
}

impl HttpTranslator {
    pub fn new(client: Arc<SpeechServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> anyhow::Result<String> {
        let model_id = Language::translation_model(source, target);
        let model = self.client.model(&model_id).await?;
        tracing::debug!(model = %model.model_id, chars = text.len(), "Translating text");

        self.client.translate_text(&model, text).await
    }
}

/// Speech synthesis through the service
#[derive(Debug, Clone)]
pub struct HttpSynthesizer {
    client: Arc<SpeechServiceClient>,
}

impl HttpSynthesizer {
    pub fn new(client: Arc<SpeechServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> anyhow::Result<AudioBuffer> {
        let model = self.client.model(language.tts_model()).await?;
        tracing::debug!(model = %model.model_id, chars = text.len(), "Synthesizing speech");

        let wav = self.client.synthesize_wav(&model, text).await?;
        if wav.is_empty() {
            bail!("Speech service returned no audio");
        }
        Ok(decode_wav_bytes(&wav)?)
    }
}

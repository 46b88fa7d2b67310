//! Request and result types at the pipeline boundary

use super::state::StateTransition;
use crate::error::{PipelineError, Result};
use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;
use vdub_common::Language;

/// One dubbing job
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Input file contents, any supported container
    pub audio: Vec<u8>,
    /// Requested output language code
    pub target_language: String,
    /// Original filename, used as a format hint
    pub filename_hint: Option<String>,
}

impl PipelineRequest {
    pub fn new(audio: Vec<u8>, target_language: impl Into<String>) -> Self {
        Self {
            audio,
            target_language: target_language.into(),
            filename_hint: None,
        }
    }

    pub fn with_filename_hint(mut self, filename: impl Into<String>) -> Self {
        self.filename_hint = Some(filename.into());
        self
    }

    /// Check the request before any work starts
    ///
    /// # Errors
    /// `UnsupportedLanguage` for a code outside the supported set,
    /// `InvalidRequest` for an empty payload.
    pub fn validate(&self) -> Result<Language> {
        let language = Language::from_code(&self.target_language)
            .map_err(|_| PipelineError::UnsupportedLanguage(self.target_language.clone()))?;

        if self.audio.is_empty() {
            return Err(PipelineError::InvalidRequest("audio payload is empty".to_string()));
        }

        Ok(language)
    }

    /// Extension from the filename hint, lowercased, if it is a plain token
    pub fn file_extension(&self) -> Option<String> {
        let name = self.filename_hint.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Successful pipeline output
#[derive(Debug, Clone)]
pub struct DubbedAudio {
    pub request_id: Uuid,
    /// Encoded mix
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub duration_secs: f64,
    pub source_language: Language,
    pub target_language: Language,
    /// Every state change of the run, IDLE → ... → COMPLETED
    pub transitions: Vec<StateTransition>,
}

impl IntoResponse for DubbedAudio {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, self.content_type)], self.bytes).into_response()
    }
}

/// Outcome of one run
pub type PipelineResult = Result<DubbedAudio>;

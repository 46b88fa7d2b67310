//! Error types for vdub-pipeline
//!
//! Every stage reports one of these variants. The orchestrator logs the full
//! error and hands the caller only [`PipelineError::public_message`], so
//! internal paths and collaborator responses never leave the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Generic message for every failure that is not a request-validation error
pub const GENERIC_FAILURE_MESSAGE: &str = "processing failed";

/// Pipeline error taxonomy
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Target language outside the supported set (rejected before any stage)
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Missing or empty audio payload (rejected before any stage)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Decoder could not recognize the container or codec
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Demuxing or decoding failed partway
    #[error("Corrupt audio: {0}")]
    CorruptAudio(String),

    /// AudioBuffer invariant violated (channel lengths, layout, sample rate)
    #[error("Invalid audio state: {0}")]
    InvalidAudioState(String),

    /// Speech recognition produced no text or failed
    #[error("Transcription failed: {0}")]
    Transcription(String),

    /// Translation produced no text or failed
    #[error("Translation failed: {0}")]
    Translation(String),

    /// Speech synthesis failed
    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// Encoder unavailable or output write failed
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// Scratch directory could not be created or written
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Caller cancelled the request or its deadline passed
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Broken internal invariant (illegal transition, panicked task)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// HTTP-equivalent status for this failure
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::UnsupportedLanguage(_) | PipelineError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            PipelineError::CorruptAudio(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            PipelineError::InvalidAudioState(_)
            | PipelineError::Transcription(_)
            | PipelineError::Translation(_)
            | PipelineError::Synthesis(_)
            | PipelineError::Encoding(_)
            | PipelineError::Workspace(_)
            | PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the caller sent something we cannot process
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedLanguage(_) => "UNSUPPORTED_LANGUAGE",
            PipelineError::InvalidRequest(_) => "BAD_REQUEST",
            PipelineError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            PipelineError::CorruptAudio(_) => "CORRUPT_AUDIO",
            PipelineError::Cancelled => "CANCELLED",
            _ => "PROCESSING_FAILED",
        }
    }

    /// Message safe to show the caller
    ///
    /// Request-validation errors get an actionable message; everything that
    /// happens inside a stage gets the generic one.
    pub fn public_message(&self) -> String {
        match self {
            PipelineError::UnsupportedLanguage(code) => format!(
                "unsupported target language '{}' (supported: en, es, fr, de, it, pt)",
                code
            ),
            PipelineError::InvalidRequest(reason) => format!("invalid request: {}", reason),
            PipelineError::UnsupportedFormat(_) => "unsupported audio format".to_string(),
            PipelineError::CorruptAudio(_) => "audio payload could not be decoded".to_string(),
            PipelineError::Cancelled => "request cancelled".to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<vdub_common::Error> for PipelineError {
    fn from(err: vdub_common::Error) -> Self {
        match err {
            vdub_common::Error::UnsupportedLanguage(code) => PipelineError::UnsupportedLanguage(code),
            vdub_common::Error::InvalidInput(msg) => PipelineError::InvalidRequest(msg),
            other => PipelineError::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            PipelineError::Cancelled
        } else {
            PipelineError::Internal(format!("blocking task failed: {}", err))
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
            }
        }));

        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_client_errors() {
        assert!(PipelineError::UnsupportedLanguage("zz".into()).is_client_error());
        assert!(PipelineError::InvalidRequest("empty".into()).is_client_error());
        assert!(PipelineError::UnsupportedFormat("probe".into()).is_client_error());
    }

    #[test]
    fn test_stage_errors_are_server_errors() {
        for err in [
            PipelineError::Transcription("x".into()),
            PipelineError::Translation("x".into()),
            PipelineError::Synthesis("x".into()),
            PipelineError::Encoding("x".into()),
            PipelineError::Workspace("x".into()),
            PipelineError::InvalidAudioState("x".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_public_message_hides_internal_detail() {
        let err = PipelineError::Encoding("/tmp/vdub/vdub-1234/mix.wav: permission denied".into());
        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);
        assert!(!err.public_message().contains("/tmp"));
    }

    #[test]
    fn test_language_error_message_is_actionable() {
        let message = PipelineError::UnsupportedLanguage("zz".into()).public_message();
        assert!(message.contains("zz"));
        assert!(message.contains("supported"));
    }

    #[tokio::test]
    async fn test_response_body_hides_detail() {
        use http_body_util::BodyExt;

        let response = PipelineError::Synthesis("model at /srv/models/tts crashed".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "PROCESSING_FAILED");
        assert_eq!(json["error"]["message"], GENERIC_FAILURE_MESSAGE);
        assert!(!String::from_utf8_lossy(&body).contains("/srv"));
    }

    #[test]
    fn test_common_error_conversion() {
        let err: PipelineError = vdub_common::Error::UnsupportedLanguage("xx".into()).into();
        assert!(matches!(err, PipelineError::UnsupportedLanguage(ref c) if c == "xx"));
    }
}

//! Supported languages and their model mapping
//!
//! Language is a closed set. Every per-language parameter handed to the
//! speech collaborators (TTS voice, translation model, display name) is
//! looked up in [`PROFILES`]; no other module branches on the language.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source language assumed when speech recognition reports nothing usable
pub const FALLBACK_SOURCE_LANGUAGE: Language = Language::En;

/// Multilingual speech recognition model shared by every language
pub const ASR_MODEL_ID: &str = "openai/whisper-small";

/// Supported language (ISO 639-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
}

/// Per-language collaborator parameters
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    /// ISO 639-1 code as used on the wire
    pub code: &'static str,
    /// English display name
    pub name: &'static str,
    /// Text-to-speech model for this language
    pub tts_model: &'static str,
}

/// Central lookup table, one row per supported language, in enum order
static PROFILES: [(Language, LanguageProfile); 6] = [
    (
        Language::En,
        LanguageProfile { code: "en", name: "English", tts_model: "facebook/mms-tts-eng" },
    ),
    (
        Language::Es,
        LanguageProfile { code: "es", name: "Spanish", tts_model: "facebook/mms-tts-spa" },
    ),
    (
        Language::Fr,
        LanguageProfile { code: "fr", name: "French", tts_model: "facebook/mms-tts-fra" },
    ),
    (
        Language::De,
        LanguageProfile { code: "de", name: "German", tts_model: "facebook/mms-tts-deu" },
    ),
    (
        Language::It,
        LanguageProfile { code: "it", name: "Italian", tts_model: "facebook/mms-tts-ita" },
    ),
    (
        Language::Pt,
        LanguageProfile { code: "pt", name: "Portuguese", tts_model: "facebook/mms-tts-por" },
    ),
];

impl Language {
    /// All supported languages, in table order
    pub fn all() -> impl Iterator<Item = Language> {
        PROFILES.iter().map(|(language, _)| *language)
    }

    /// Parse a language code strictly (used for the requested target language)
    pub fn from_code(code: &str) -> Result<Self> {
        let normalized = code.trim().to_ascii_lowercase();
        PROFILES
            .iter()
            .find(|(_, profile)| profile.code == normalized)
            .map(|(language, _)| *language)
            .ok_or_else(|| Error::UnsupportedLanguage(code.to_string()))
    }

    /// Resolve a detected source language, falling back to English
    ///
    /// Only used for what speech recognition reports. A missing or
    /// unsupported detection is not an error.
    pub fn from_detected(code: Option<&str>) -> Self {
        code.and_then(|c| Self::from_code(c).ok())
            .unwrap_or(FALLBACK_SOURCE_LANGUAGE)
    }

    pub fn profile(self) -> &'static LanguageProfile {
        &PROFILES[self as usize].1
    }

    pub fn code(self) -> &'static str {
        self.profile().code
    }

    pub fn name(self) -> &'static str {
        self.profile().name
    }

    pub fn tts_model(self) -> &'static str {
        self.profile().tts_model
    }

    /// Translation model identifier for a source → target pair
    pub fn translation_model(source: Language, target: Language) -> String {
        format!("Helsinki-NLP/opus-mt-{}-{}", source.code(), target.code())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_codes() {
        for code in ["en", "es", "fr", "de", "it", "pt"] {
            let language = Language::from_code(code).unwrap();
            assert_eq!(language.code(), code);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Language::from_code(" ES ").unwrap(), Language::Es);
    }

    #[test]
    fn test_unsupported_code_rejected() {
        let err = Language::from_code("zz").unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(ref c) if c == "zz"));
        assert!(Language::from_code("").is_err());
    }

    #[test]
    fn test_detected_language_falls_back_to_english() {
        assert_eq!(Language::from_detected(None), Language::En);
        assert_eq!(Language::from_detected(Some("ja")), Language::En);
        assert_eq!(Language::from_detected(Some("fr")), Language::Fr);
    }

    #[test]
    fn test_every_language_has_a_profile() {
        assert_eq!(Language::all().count(), 6);
        for (index, language) in Language::all().enumerate() {
            assert_eq!(language as usize, index);
            assert_eq!(language.profile().code, language.code());
            assert!(language.tts_model().starts_with("facebook/mms-tts-"));
        }
    }

    #[test]
    fn test_translation_model_lookup() {
        assert_eq!(
            Language::translation_model(Language::En, Language::De),
            "Helsinki-NLP/opus-mt-en-de"
        );
    }
}

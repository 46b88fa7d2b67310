//! Test Helper Utilities
//!
//! Shared utilities for testing vdub-pipeline

#![allow(dead_code)]

pub mod analysis;
pub mod audio_generator;
pub mod fakes;

// Re-export commonly used items
pub use analysis::{rms, zero_crossing_frequency};
pub use audio_generator::{generate_test_wav, sine_buffer, sine_wav_bytes, ToneConfig};
pub use fakes::{
    FakeCollaborators, FakeSynthesizer, FakeTranscriber, FakeTranslator, WavTestEncoder,
};

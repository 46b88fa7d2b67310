//! # vdub-pipeline
//!
//! Audio dubbing pipeline: replaces the narration of an audio file with a
//! synthesized voice in another language while keeping the backing track.
//!
//! Stages, leaves first:
//! - [`workspace`]: per-request scratch directory, removed on every exit path
//! - [`audio::normalizer`]: any container/codec → 44.1 kHz stereo f32
//! - [`audio::separator`]: vocal suppression → instrumental bed
//! - [`audio::voice`]: loudness leveling of the synthesized voice
//! - [`audio::mixer`] / [`audio::encoder`]: sum, limit, encode to MP3
//! - [`orchestrator`]: state machine driving the stages and the speech
//!   [`collaborators`]

pub mod audio;
pub mod collaborators;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod workspace;

pub use error::{PipelineError, Result};
pub use orchestrator::{
    Collaborators, DubbedAudio, PipelineOrchestrator, PipelineRequest, PipelineResult, PipelineSettings,
    PipelineState, StateTransition,
};
pub use workspace::Workspace;

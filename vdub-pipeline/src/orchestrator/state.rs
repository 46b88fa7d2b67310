//! Pipeline state machine
//!
//! IDLE → NORMALIZING → SEPARATING → TRANSCRIBING → TRANSLATING →
//! SYNTHESIZING → POST_PROCESSING_VOICE → MIXING → COMPLETED,
//! with FAILED reachable from every non-terminal state.
//!
//! The instrumental branch (SEPARATING) and the voice branch (TRANSCRIBING
//! through SYNTHESIZING) may overlap in time. The recorded order stays the
//! one above because the instrumental branch always announces itself first.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{error, info};
use uuid::Uuid;

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Request accepted, nothing started
    Idle,
    /// Decoding input to canonical PCM
    Normalizing,
    /// Deriving the instrumental bed
    Separating,
    /// Speech recognition
    Transcribing,
    /// Text translation
    Translating,
    /// Speech synthesis
    Synthesizing,
    /// Leveling the synthesized voice
    PostProcessingVoice,
    /// Mixing and encoding
    Mixing,
    /// Encoded output produced
    Completed,
    /// A stage failed or the request was cancelled
    Failed,
}

impl PipelineState {
    /// Every state of a successful run, in order
    pub const HAPPY_PATH: [PipelineState; 9] = [
        PipelineState::Idle,
        PipelineState::Normalizing,
        PipelineState::Separating,
        PipelineState::Transcribing,
        PipelineState::Translating,
        PipelineState::Synthesizing,
        PipelineState::PostProcessingVoice,
        PipelineState::Mixing,
        PipelineState::Completed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }

    /// True if `next` is an edge of the state graph
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Idle, Normalizing)
                | (Normalizing, Separating)
                | (Separating, Transcribing)
                | (Transcribing, Translating)
                | (Translating, Synthesizing)
                | (Synthesizing, PostProcessingVoice)
                | (PostProcessingVoice, Mixing)
                | (Mixing, Completed)
        )
    }
}

/// State transition event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub request_id: Uuid,
    pub from: PipelineState,
    pub to: PipelineState,
    pub at: DateTime<Utc>,
}

struct TrackerInner {
    state: PipelineState,
    history: Vec<StateTransition>,
}

/// Per-request state holder
///
/// Shared by both branches; every transition is validated against the graph,
/// recorded, logged and broadcast.
pub struct StateTracker {
    request_id: Uuid,
    inner: Mutex<TrackerInner>,
    events: broadcast::Sender<StateTransition>,
}

impl StateTracker {
    pub fn new(request_id: Uuid, events: broadcast::Sender<StateTransition>) -> Self {
        Self {
            request_id,
            inner: Mutex::new(TrackerInner {
                state: PipelineState::Idle,
                history: Vec::new(),
            }),
            events,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn current(&self) -> PipelineState {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).state
    }

    /// Move to `next`
    ///
    /// # Errors
    /// `Internal` if `next` is not reachable from the current state.
    pub fn transition_to(&self, next: PipelineState) -> Result<StateTransition> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let from = inner.state;

        if !from.can_transition_to(next) {
            error!(
                request_id = %self.request_id,
                from = ?from,
                to = ?next,
                "Illegal pipeline state transition"
            );
            return Err(PipelineError::Internal(format!(
                "illegal transition {:?} -> {:?}",
                from, next
            )));
        }

        let transition = StateTransition {
            request_id: self.request_id,
            from,
            to: next,
            at: Utc::now(),
        };
        inner.state = next;
        inner.history.push(transition.clone());
        drop(inner);

        info!(request_id = %self.request_id, state = ?next, "Pipeline state changed");

        // No subscribers is fine
        let _ = self.events.send(transition.clone());
        Ok(transition)
    }

    /// Move to FAILED unless already terminal
    pub fn fail(&self) {
        if !self.current().is_terminal() {
            // Cannot be illegal from a non-terminal state
            let _ = self.transition_to(PipelineState::Failed);
        }
    }

    /// Transitions recorded so far
    pub fn history(&self) -> Vec<StateTransition> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .clone()
    }
}

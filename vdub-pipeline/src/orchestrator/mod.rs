//! Pipeline orchestrator
//!
//! Drives one request through every stage:
//!
//! ```text
//! NORMALIZING ─┬─ SEPARATING ─────────────────────────────────┬─ POST_PROCESSING_VOICE → MIXING → COMPLETED
//!              └─ TRANSCRIBING → TRANSLATING → SYNTHESIZING ──┘
//! ```
//!
//! The request is validated before anything else happens. The workspace is
//! acquired next and released on every exit path. The two branches run
//! concurrently unless `concurrent_branches` is off; a failure in one
//! cancels the other through a shared child token. The caller's token is
//! checked between stages and raced against every in-flight stage.

pub mod request;
pub mod state;

pub use request::{DubbedAudio, PipelineRequest, PipelineResult};
pub use state::{PipelineState, StateTracker, StateTransition};

use crate::audio::{
    AudioBuffer, AudioEncoder, FormatNormalizer, Mixer, SeparatorSettings, SourceSeparator, VoiceLeveler,
};
use crate::collaborators::{Synthesizer, Transcriber, Translator};
use crate::error::{PipelineError, Result};
use crate::workspace::Workspace;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vdub_common::config::TomlConfig;
use vdub_common::Language;

/// Capacity of the state event channel; slow subscribers lose old events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Numeric parameters of every stage
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Parent of per-request workspaces
    pub workspace_root: PathBuf,
    /// Canonical and output sample rate
    pub sample_rate: u32,
    pub voice_target_rms_dbfs: f32,
    pub voice_peak_ceiling_dbfs: f32,
    /// Run the instrumental and voice branches at the same time
    pub concurrent_branches: bool,
    pub separator: SeparatorSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

impl PipelineSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            workspace_root: config.workspace_root.clone(),
            sample_rate: config.audio.sample_rate,
            voice_target_rms_dbfs: config.audio.voice_target_rms_dbfs,
            voice_peak_ceiling_dbfs: config.audio.voice_peak_ceiling_dbfs,
            concurrent_branches: config.audio.concurrent_branches,
            separator: SeparatorSettings::default(),
        }
    }
}

/// The three speech collaborators the voice branch calls
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// Runs dubbing requests
pub struct PipelineOrchestrator {
    settings: PipelineSettings,
    normalizer: FormatNormalizer,
    separator: SourceSeparator,
    voice_leveler: VoiceLeveler,
    mixer: Mixer,
    collaborators: Collaborators,
    encoder: Arc<dyn AudioEncoder>,
    events: broadcast::Sender<StateTransition>,
}

impl PipelineOrchestrator {
    pub fn new(
        settings: PipelineSettings,
        collaborators: Collaborators,
        encoder: Arc<dyn AudioEncoder>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            normalizer: FormatNormalizer::new(settings.sample_rate),
            separator: SourceSeparator::new(settings.separator.clone()),
            voice_leveler: VoiceLeveler::new(settings.voice_target_rms_dbfs, settings.voice_peak_ceiling_dbfs),
            mixer: Mixer::new(settings.sample_rate),
            settings,
            collaborators,
            encoder,
            events,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// State transitions of every request run by this orchestrator
    pub fn subscribe(&self) -> broadcast::Receiver<StateTransition> {
        self.events.subscribe()
    }

    /// Run a request to completion
    pub async fn run(&self, request: PipelineRequest) -> PipelineResult {
        self.run_with_cancellation(request, CancellationToken::new()).await
    }

    /// Run a request, stopping with `Cancelled` once `cancel` fires
    pub async fn run_with_cancellation(
        &self,
        request: PipelineRequest,
        cancel: CancellationToken,
    ) -> PipelineResult {
        let request_id = Uuid::new_v4();

        let target = match request.validate() {
            Ok(target) => target,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Rejected pipeline request");
                return Err(e);
            }
        };

        info!(
            request_id = %request_id,
            target = %target,
            bytes = request.audio.len(),
            "Starting pipeline"
        );

        let tracker = StateTracker::new(request_id, self.events.clone());
        let workspace = match Workspace::acquire(&self.settings.workspace_root) {
            Ok(workspace) => workspace,
            Err(e) => {
                tracker.fail();
                error!(request_id = %request_id, error = %e, "Pipeline failed");
                return Err(e);
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = self.execute(&request, target, &tracker, &workspace, &cancel) => result,
        };

        match &result {
            Ok(dubbed) => info!(
                request_id = %request_id,
                duration_secs = dubbed.duration_secs,
                bytes = dubbed.bytes.len(),
                "Pipeline completed"
            ),
            Err(PipelineError::Cancelled) => {
                tracker.fail();
                info!(request_id = %request_id, "Pipeline cancelled");
            }
            Err(e) => {
                tracker.fail();
                error!(request_id = %request_id, state = ?tracker.current(), error = %e, "Pipeline failed");
            }
        }

        if let Err(e) = workspace.release().await {
            warn!(request_id = %request_id, error = %e, "Workspace cleanup failed");
        }

        result
    }

    async fn execute(
        &self,
        request: &PipelineRequest,
        target: Language,
        tracker: &StateTracker,
        workspace: &Workspace,
        cancel: &CancellationToken,
    ) -> PipelineResult {
        tracker.transition_to(PipelineState::Normalizing)?;
        let input_name = match request.file_extension() {
            Some(ext) => format!("input.{}", ext),
            None => "input".to_string(),
        };
        let input_path = workspace.write_file(&input_name, &request.audio).await?;
        let normalizer = self.normalizer.clone();
        let normalized = Arc::new(run_blocking(move || normalizer.normalize(&input_path)).await?);
        checkpoint(cancel)?;

        let branches = cancel.child_token();
        let (instrumental, (voice, source)) = if self.settings.concurrent_branches {
            tokio::try_join!(
                cancel_on_error(&branches, self.instrumental_branch(normalized.clone(), tracker, &branches)),
                cancel_on_error(&branches, self.voice_branch(normalized.clone(), target, tracker, &branches)),
            )?
        } else {
            let instrumental = self.instrumental_branch(normalized.clone(), tracker, &branches).await?;
            let voice = self.voice_branch(normalized.clone(), target, tracker, &branches).await?;
            (instrumental, voice)
        };
        drop(normalized);
        checkpoint(cancel)?;

        tracker.transition_to(PipelineState::PostProcessingVoice)?;
        let leveler = self.voice_leveler;
        let voice = run_blocking(move || Ok(leveler.normalize_voice(voice))).await?;
        checkpoint(cancel)?;

        tracker.transition_to(PipelineState::Mixing)?;
        let mixer = self.mixer.clone();
        let mixed = run_blocking(move || mixer.mix(&instrumental, &voice)).await?;
        checkpoint(cancel)?;
        let bytes = self.encoder.encode(&mixed, workspace).await?;

        tracker.transition_to(PipelineState::Completed)?;

        Ok(DubbedAudio {
            request_id: tracker.request_id(),
            bytes,
            content_type: self.encoder.content_type(),
            duration_secs: mixed.duration_secs(),
            source_language: source,
            target_language: target,
            transitions: tracker.history(),
        })
    }

    /// Branch A: normalized PCM → instrumental bed
    async fn instrumental_branch(
        &self,
        normalized: Arc<AudioBuffer>,
        tracker: &StateTracker,
        token: &CancellationToken,
    ) -> Result<AudioBuffer> {
        checkpoint(token)?;
        tracker.transition_to(PipelineState::Separating)?;

        let separator = self.separator.clone();
        until_cancelled(
            token,
            run_blocking(move || separator.separate_instrumental(&normalized)),
        )
        .await
    }

    /// Branch B: normalized PCM → transcript → translation → synthesized voice
    ///
    /// Returns the voice and the source language it was translated from.
    async fn voice_branch(
        &self,
        normalized: Arc<AudioBuffer>,
        target: Language,
        tracker: &StateTracker,
        token: &CancellationToken,
    ) -> Result<(AudioBuffer, Language)> {
        checkpoint(token)?;
        tracker.transition_to(PipelineState::Transcribing)?;
        let transcript = until_cancelled(token, async {
            self.collaborators
                .transcriber
                .transcribe(&normalized)
                .await
                .map_err(|e| PipelineError::Transcription(format!("{:#}", e)))
        })
        .await?;
        drop(normalized);

        if transcript.text.trim().is_empty() {
            return Err(PipelineError::Transcription("recognizer returned no text".to_string()));
        }
        let source = Language::from_detected(transcript.detected_language.as_deref());
        debug!(
            request_id = %tracker.request_id(),
            detected = ?transcript.detected_language,
            source = %source,
            chars = transcript.text.len(),
            "Transcribed"
        );

        checkpoint(token)?;
        tracker.transition_to(PipelineState::Translating)?;
        let translated = if source == target {
            debug!(request_id = %tracker.request_id(), "Source equals target, skipping translation");
            transcript.text
        } else {
            let text = until_cancelled(token, async {
                self.collaborators
                    .translator
                    .translate(&transcript.text, source, target)
                    .await
                    .map_err(|e| PipelineError::Translation(format!("{:#}", e)))
            })
            .await?;
            if text.trim().is_empty() {
                return Err(PipelineError::Translation("translator returned no text".to_string()));
            }
            text
        };

        checkpoint(token)?;
        tracker.transition_to(PipelineState::Synthesizing)?;
        let voice = until_cancelled(token, async {
            self.collaborators
                .synthesizer
                .synthesize(&translated, target)
                .await
                .map_err(|e| PipelineError::Synthesis(format!("{:#}", e)))
        })
        .await?;

        Ok((voice, source))
    }
}

/// Fail with `Cancelled` if `token` has fired
fn checkpoint(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

/// Race `future` against `token`
async fn until_cancelled<T>(token: &CancellationToken, future: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PipelineError::Cancelled),
        result = future => result,
    }
}

/// Cancel the sibling branch when this one fails
async fn cancel_on_error<T>(token: &CancellationToken, future: impl Future<Output = Result<T>>) -> Result<T> {
    let result = future.await;
    if result.is_err() {
        token.cancel();
    }
    result
}

/// Run CPU-bound work on the blocking pool
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

use std::path::Path;

use chat_backend::{BackendError, BackendRegistry, ChatConfig};

use crate::context::ModelHandle;
use crate::conversation::{ConversationState, Phase};
use crate::error::{InferenceStage, LoadStage, Result, SessionError};
use crate::stats::RuntimeStats;
use crate::types::{PrefillInput, SessionState, StopReason, Turn};

/// A conversational inference session over one loaded model.
///
/// ```text
/// reload -> prefill (one or more) -> decode until stopped -> prefill ...
/// ```
///
/// All operations take `&mut self`; wrap the session in
/// [`SharedSession`](crate::SharedSession) to drive it from several threads.
pub struct ChatSession {
    registry: BackendRegistry,
    handle: Option<ModelHandle>,
    conversation: ConversationState,
    stats: RuntimeStats,
}

impl ChatSession {
    /// Create an unloaded session that resolves models through `registry`.
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry,
            handle: None,
            conversation: ConversationState::default(),
            stats: RuntimeStats::default(),
        }
    }

    /// Load `model_id` from `model_path`, replacing any loaded model.
    ///
    /// The previous model is released first, so a failed reload leaves the
    /// session unloaded.
    pub fn reload(&mut self, model_id: &str, model_path: impl AsRef<Path>) -> Result<()> {
        let model_path = model_path.as_ref();
        self.unload();

        let load_error = |stage: LoadStage| {
            move |source: BackendError| SessionError::Load {
                model: model_id.to_string(),
                stage,
                source,
            }
        };

        let loader = self
            .registry
            .resolve(model_id)
            .map_err(load_error(LoadStage::Resolve))?;
        let config = ChatConfig::load(model_path).map_err(load_error(LoadStage::Config))?;
        let loaded = loader
            .load(model_path, &config)
            .map_err(load_error(LoadStage::Backend))?;
        let handle = ModelHandle::new(model_id, model_path, config, loaded)
            .map_err(load_error(LoadStage::Validate))?;

        tracing::info!(
            model = model_id,
            path = %model_path.display(),
            context_window = handle.config().context_window_size,
            "model loaded"
        );
        self.handle = Some(handle);
        Ok(())
    }

    /// Release the loaded model and drop the conversation. A no-op when
    /// nothing is loaded.
    pub fn unload(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
            tracing::info!(model = handle.model_id(), "model unloaded");
        }
        self.conversation.reset();
        self.stats.reset();
    }

    /// Start a fresh conversation with the same model.
    pub fn reset_chat(&mut self) -> Result<()> {
        let handle = self.handle.as_mut().ok_or(SessionError::NotLoaded)?;
        handle.reset();
        self.conversation.reset();
        self.stats.reset();
        tracing::info!(model = handle.model_id(), "chat reset");
        Ok(())
    }

    /// Feed text or an image into the current user turn, opening one if
    /// needed.
    ///
    /// Prefilling while a reply is being generated ends that reply and
    /// starts a new user turn on top of the existing context.
    pub fn prefill(&mut self, input: impl Into<PrefillInput>) -> Result<()> {
        let handle = self.handle.as_mut().ok_or(SessionError::NotLoaded)?;
        let result = self.conversation.prefill(handle, &mut self.stats, input.into());
        self.recover(result)
    }

    /// Generate one token of the assistant reply.
    pub fn decode(&mut self) -> Result<()> {
        let handle = self.handle.as_mut().ok_or(SessionError::NotLoaded)?;
        let result = self.conversation.decode(handle, &mut self.stats);
        self.recover(result)
    }

    /// The reply generated so far in the current turn.
    pub fn get_message(&self) -> &str {
        self.conversation.message()
    }

    pub fn stopped(&self) -> bool {
        self.conversation.phase() == Phase::Stopped
    }

    /// Why the last reply stopped, if it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.conversation.stop_reason()
    }

    pub fn state(&self) -> SessionState {
        if self.handle.is_none() {
            return SessionState::Unloaded;
        }
        match self.conversation.phase() {
            Phase::Idle => SessionState::Loaded,
            Phase::Prefilling => SessionState::Prefilling,
            Phase::Decoding => SessionState::Decoding,
            Phase::Stopped => SessionState::Stopped,
        }
    }

    /// Completed turns, oldest first. A user turn is complete once decoding
    /// starts; an assistant turn once it stops or is interrupted.
    pub fn history(&self) -> &[Turn] {
        self.conversation.history()
    }

    /// Number of context positions in use.
    pub fn context_position(&self) -> usize {
        self.conversation.position()
    }

    pub fn runtime_stats(&self) -> &RuntimeStats {
        &self.stats
    }

    pub fn runtime_stats_text(&self) -> String {
        self.stats.to_string()
    }

    /// Run the backend's diagnostic pass. The conversation is untouched.
    pub fn evaluate(&mut self) -> Result<String> {
        let handle = self.handle.as_mut().ok_or(SessionError::NotLoaded)?;
        handle.evaluate().map_err(|source| SessionError::Inference {
            stage: InferenceStage::Evaluate,
            source,
        })
    }

    pub fn model_id(&self) -> Option<&str> {
        self.handle.as_ref().map(|h| h.model_id())
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.handle.as_ref().map(|h| h.model_path())
    }

    /// Config of the loaded model.
    pub fn config(&self) -> Option<&ChatConfig> {
        self.handle.as_ref().map(|h| h.config())
    }

    /// After a backend fault the KV cache can no longer be trusted, so the
    /// conversation is dropped and the session returns to `Loaded`.
    fn recover<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(SessionError::Inference { stage, source }) = &result {
            tracing::warn!(%stage, error = %source, "inference failed, resetting conversation");
            if let Some(handle) = self.handle.as_mut() {
                handle.reset();
            }
            self.conversation.reset();
            self.stats.reset();
        }
        result
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("model", &self.model_id())
            .field("state", &self.state())
            .field("position", &self.context_position())
            .finish()
    }
}

use std::time::Instant;

use chat_backend::{BackendError, ContextInput};

use crate::context::ModelHandle;
use crate::error::{InferenceStage, Result, SessionError};
use crate::stats::RuntimeStats;
use crate::streaming::MessageBuffer;
use crate::types::{prepare_image, Content, PrefillInput, Role, StopReason, Turn};

/// Where the current turn stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Phase {
    /// No turn in progress.
    #[default]
    Idle,
    Prefilling,
    Decoding,
    Stopped,
}

/// Validated prefill content, ready to feed.
enum Prepared {
    Text(String),
    Image {
        image: chat_tensor::Tensor,
        positions: usize,
    },
}

/// Conversation history and the progress of the current turn.
#[derive(Debug, Default)]
pub(crate) struct ConversationState {
    history: Vec<Turn>,
    /// User turn being assembled; moves to `history` when decoding starts.
    open_user: Option<Turn>,
    message: MessageBuffer,
    phase: Phase,
    stop_reason: Option<StopReason>,
    /// Tokens sampled in the current turn.
    generated: usize,
    /// Next KV cache position.
    pos: usize,
    /// Logits for the next sample.
    logits: Option<Vec<f32>>,
}

fn inference(stage: InferenceStage) -> impl FnOnce(BackendError) -> SessionError {
    move |source| SessionError::Inference { stage, source }
}

impl ConversationState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn message(&self) -> &str {
        self.message.text()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self) {
        *self = ConversationState::default();
    }

    /// Feed one piece of user input.
    ///
    /// Validation happens before anything is mutated, so an `InvalidInput`
    /// error leaves the conversation as it was.
    pub fn prefill(
        &mut self,
        handle: &mut ModelHandle,
        stats: &mut RuntimeStats,
        input: PrefillInput,
    ) -> Result<()> {
        let content = match input {
            PrefillInput::Text(text) => {
                if text.is_empty() {
                    return Err(SessionError::InvalidInput("empty text".to_string()));
                }
                Prepared::Text(text)
            }
            PrefillInput::Image(image) => {
                let positions = handle.image_embed_len().ok_or_else(|| {
                    SessionError::InvalidInput(format!(
                        "model '{}' does not accept images",
                        handle.model_id()
                    ))
                })?;
                Prepared::Image {
                    image: prepare_image(image)?,
                    positions,
                }
            }
        };

        let template = &handle.config().conv_template;
        let opens_turn = self.phase != Phase::Prefilling;
        let first_turn = self.history.is_empty() && self.open_user.is_none();

        let mut prefix = String::new();
        if opens_turn {
            prefix = template.user_prefix(first_turn);
        }
        let tokenizer = handle.tokenizer();
        let mut tokens = Vec::new();
        if opens_turn && first_turn && template.add_bos {
            tokens.extend(tokenizer.bos_id());
        }
        let image_positions = match &content {
            Prepared::Text(text) => {
                prefix.push_str(text);
                0
            }
            Prepared::Image { positions, .. } => *positions,
        };
        tokens.extend(tokenizer.encode(&prefix));

        // Leave room for the assistant prefix that seals the prompt.
        let seal = tokenizer.encode(&template.assistant_prefix()).len();
        let needed = tokens.len() + image_positions;
        let window = handle.config().context_window_size;
        if self.pos + needed + seal > window {
            return Err(SessionError::InvalidInput(format!(
                "prompt needs {} positions but only {} of {} remain",
                needed + seal,
                window.saturating_sub(self.pos),
                window
            )));
        }

        if self.phase == Phase::Decoding {
            self.commit_reply();
        }
        if opens_turn {
            tracing::debug!(first_turn, pos = self.pos, "opening user turn");
            self.message = MessageBuffer::with_stop_strings(&template.stop_strings);
            self.generated = 0;
            self.stop_reason = None;
            self.open_user = Some(Turn {
                role: Role::User,
                parts: Vec::new(),
            });
        }

        let start = Instant::now();
        let mut logits = None;
        if !tokens.is_empty() {
            logits = Some(
                handle
                    .forward(ContextInput::Tokens(&tokens), self.pos)
                    .map_err(inference(InferenceStage::Prefill))?,
            );
            self.pos += tokens.len();
        }
        let part = match content {
            // The turn prefix went in with the text but is not recorded.
            Prepared::Text(text) => Content::Text(text),
            Prepared::Image { image, positions } => {
                logits = Some(
                    handle
                        .forward(ContextInput::Image(&image), self.pos)
                        .map_err(inference(InferenceStage::Prefill))?,
                );
                self.pos += positions;
                Content::Image
            }
        };
        stats.record_prefill(needed, start.elapsed());

        if let Some(turn) = self.open_user.as_mut() {
            turn.parts.push(part);
        }
        if logits.is_some() {
            self.logits = logits;
        }
        self.phase = Phase::Prefilling;
        Ok(())
    }

    /// Generate one token of the reply.
    pub fn decode(&mut self, handle: &mut ModelHandle, stats: &mut RuntimeStats) -> Result<()> {
        match self.phase {
            Phase::Idle => return Err(SessionError::NothingToDecode),
            Phase::Stopped => return Err(SessionError::AlreadyStopped),
            Phase::Prefilling => self.seal_prompt(handle, stats)?,
            Phase::Decoding => {}
        }

        let start = Instant::now();
        let logits = self.logits.take().ok_or(SessionError::NothingToDecode)?;
        let token = handle.sample(&logits).ok_or_else(|| SessionError::Inference {
            stage: InferenceStage::Decode,
            source: BackendError::Forward("no logits to sample from".to_string()),
        })?;
        self.generated += 1;

        let outcome = self.advance(handle, token);
        stats.record_decode(start.elapsed());
        if let Some(reason) = outcome? {
            self.stop(reason);
        }
        Ok(())
    }

    /// Append a sampled token to the reply and feed it back, returning the
    /// stop reason if the turn is over.
    fn advance(&mut self, handle: &mut ModelHandle, token: u32) -> Result<Option<StopReason>> {
        if handle.tokenizer().is_eos(token) {
            return Ok(Some(StopReason::EndOfSequence));
        }

        // A partial stop string stays out of the message but is still fed.
        if self.message.push_bytes(&handle.tokenizer().token_bytes(token)) {
            return Ok(Some(StopReason::StopString));
        }
        let config = handle.config();
        if self.pos >= config.context_window_size {
            return Ok(Some(StopReason::ContextWindow));
        }
        let max_gen_len = config.max_gen_len;

        let logits = handle
            .forward(ContextInput::Tokens(&[token]), self.pos)
            .map_err(inference(InferenceStage::Decode))?;
        self.pos += 1;
        self.logits = Some(logits);

        if self.generated >= max_gen_len {
            return Ok(Some(StopReason::MaxGenLength));
        }
        Ok(None)
    }

    /// Close the user turn by feeding the assistant role prefix.
    ///
    /// Fails with `NothingToDecode`, leaving the turn open, when neither the
    /// prompt nor the prefix produced any tokens.
    fn seal_prompt(&mut self, handle: &mut ModelHandle, stats: &mut RuntimeStats) -> Result<()> {
        let template = &handle.config().conv_template;
        let tokens = handle.tokenizer().encode(&template.assistant_prefix());
        if tokens.is_empty() && self.logits.is_none() {
            return Err(SessionError::NothingToDecode);
        }
        if let Some(turn) = &self.open_user {
            tracing::debug!(
                prompt = %turn.render(&template.image_placeholder),
                pos = self.pos,
                "sealing user turn"
            );
        }

        if !tokens.is_empty() {
            let start = Instant::now();
            let logits = handle
                .forward(ContextInput::Tokens(&tokens), self.pos)
                .map_err(inference(InferenceStage::Prefill))?;
            self.pos += tokens.len();
            self.logits = Some(logits);
            stats.record_prefill(tokens.len(), start.elapsed());
        }

        if let Some(turn) = self.open_user.take() {
            self.history.push(turn);
        }
        self.phase = Phase::Decoding;
        Ok(())
    }

    fn stop(&mut self, reason: StopReason) {
        tracing::debug!(%reason, generated = self.generated, pos = self.pos, "reply stopped");
        self.commit_reply();
        self.stop_reason = Some(reason);
        self.phase = Phase::Stopped;
    }

    /// Record the reply so far as the assistant turn. The message stays
    /// readable until the next turn opens.
    fn commit_reply(&mut self) {
        self.message.flush();
        self.logits = None;
        self.history.push(Turn {
            role: Role::Assistant,
            parts: vec![Content::Text(self.message.text().to_string())],
        });
    }
}

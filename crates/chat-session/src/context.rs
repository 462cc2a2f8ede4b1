use std::path::{Path, PathBuf};

use chat_backend::{
    BackendError, ChatConfig, ContextInput, LoadedModel, ModelBackend, Tokenizer,
};
use chat_sampler::SamplerChain;

/// A loaded model: backend, tokenizer, the config they were loaded with and
/// the sampler built from it.
///
/// The backend is released exactly once, either explicitly or on drop.
pub(crate) struct ModelHandle {
    model_id: String,
    model_path: PathBuf,
    config: ChatConfig,
    backend: Box<dyn ModelBackend>,
    tokenizer: Box<dyn Tokenizer>,
    sampler: SamplerChain,
    released: bool,
}

impl ModelHandle {
    /// Take ownership of a freshly loaded model, checking that the
    /// tokenizer's IDs fit the backend's logits.
    ///
    /// On failure the backend is released before returning.
    pub fn new(
        model_id: &str,
        model_path: &Path,
        config: ChatConfig,
        loaded: LoadedModel,
    ) -> chat_backend::Result<ModelHandle> {
        let LoadedModel {
            mut backend,
            tokenizer,
        } = loaded;

        let logits = backend.vocab_size();
        let tokens = tokenizer.vocab_size();
        if logits == 0 || tokens == 0 || tokens > logits {
            backend.release();
            return Err(BackendError::Incompatible(format!(
                "tokenizer has {} tokens but backend produces {} logits",
                tokens, logits
            )));
        }

        let sampler = config.sampling.build_chain();
        tracing::debug!(
            model = model_id,
            vocab = logits,
            sampler = ?sampler.stage_names(),
            "model handle ready"
        );

        Ok(ModelHandle {
            model_id: model_id.to_string(),
            model_path: model_path.to_path_buf(),
            config,
            backend,
            tokenizer,
            sampler,
            released: false,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    pub fn image_embed_len(&self) -> Option<usize> {
        self.backend.image_embed_len()
    }

    /// Forward `input` at `pos`, checking the logits cover the vocabulary.
    pub fn forward(&mut self, input: ContextInput<'_>, pos: usize) -> chat_backend::Result<Vec<f32>> {
        let logits = self.backend.forward(input, pos)?;
        let expected = self.backend.vocab_size();
        if logits.len() != expected {
            return Err(BackendError::Forward(format!(
                "backend returned {} logits, expected {}",
                logits.len(),
                expected
            )));
        }
        Ok(logits)
    }

    /// Pick the next token and let stateful samplers see it.
    pub fn sample(&mut self, logits: &[f32]) -> Option<u32> {
        let token = self.sampler.sample(logits)?;
        self.sampler.accept(token);
        Some(token)
    }

    pub fn evaluate(&mut self) -> chat_backend::Result<String> {
        self.backend.evaluate()
    }

    /// Clear the KV cache and sampler state.
    pub fn reset(&mut self) {
        self.backend.reset_cache();
        self.sampler.reset();
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.backend.release();
        }
    }
}

impl Drop for ModelHandle {
    fn drop(&mut self) {
        self.release();
    }
}

use chat_tensor::Tensor;

use crate::error::{BackendError, Result};

/// New context handed to [`ModelBackend::forward`].
#[derive(Debug, Clone, Copy)]
pub enum ContextInput<'a> {
    /// Token IDs to append to the context.
    Tokens(&'a [u32]),
    /// A preprocessed image, `[3, H, W]` f32, embedded by the backend's
    /// vision tower into [`ModelBackend::image_embed_len`] positions.
    Image(&'a Tensor),
}

impl ContextInput<'_> {
    /// Number of context positions this input occupies once embedded.
    pub fn positions(&self, image_embed_len: usize) -> usize {
        match self {
            ContextInput::Tokens(tokens) => tokens.len(),
            ContextInput::Image(_) => image_embed_len,
        }
    }
}

/// A loaded conversational model that performs autoregressive inference.
///
/// Implementations hold model weights and the KV cache. The cache is opaque
/// to callers: they only track the position at which the next input starts.
pub trait ModelBackend: Send {
    /// Run the forward pass over `input`, whose first element lands at
    /// sequence position `pos`.
    ///
    /// Returns logits over the vocabulary for the last position.
    fn forward(&mut self, input: ContextInput<'_>, pos: usize) -> Result<Vec<f32>>;

    /// Number of output logits.
    fn vocab_size(&self) -> usize;

    /// Context positions consumed by one image, or `None` for text-only
    /// models.
    fn image_embed_len(&self) -> Option<usize> {
        None
    }

    /// Clear all cached context.
    fn reset_cache(&mut self);

    /// Free device resources ahead of drop. Called once before the backend
    /// is discarded.
    fn release(&mut self) {}

    /// Run the backend's built-in benchmark and return its report.
    fn evaluate(&mut self) -> Result<String> {
        Err(BackendError::Unsupported("evaluate".to_string()))
    }
}

use std::fmt;

use chat_tensor::{Shape, Tensor};

use crate::error::{Result, SessionError};

/// Fixed `[channels, height, width]` of image input.
pub const IMAGE_SHAPE: [usize; 3] = [3, 336, 336];

/// A preprocessed image: `[3, 336, 336]` planar RGB.
pub type ImageInput = Tensor;

/// One call's worth of prompt input.
#[derive(Debug, Clone)]
pub enum PrefillInput {
    /// UTF-8 text, tokenized by the loaded tokenizer.
    Text(String),
    /// A preprocessed image of shape [`IMAGE_SHAPE`], optionally with a
    /// leading batch axis of 1. f16 data is widened to f32.
    Image(ImageInput),
}

impl PrefillInput {
    /// Pack interleaved 8-bit RGB pixels into planar CHW f32, mapping each
    /// channel value `v` to `v / 255 - 0.5`.
    ///
    /// The image must already be resized to 336x336.
    pub fn image_from_rgb8(width: usize, height: usize, pixels: &[u8]) -> Result<PrefillInput> {
        let [channels, want_h, want_w] = IMAGE_SHAPE;
        if (height, width) != (want_h, want_w) {
            return Err(SessionError::InvalidInput(format!(
                "image must be {}x{}, got {}x{}",
                want_w, want_h, width, height
            )));
        }
        let plane = width * height;
        if pixels.len() != plane * channels {
            return Err(SessionError::InvalidInput(format!(
                "expected {} RGB bytes, got {}",
                plane * channels,
                pixels.len()
            )));
        }

        let mut data = vec![0.0f32; plane * channels];
        for (i, rgb) in pixels.chunks_exact(channels).enumerate() {
            for (c, &value) in rgb.iter().enumerate() {
                data[c * plane + i] = value as f32 / 255.0 - 0.5;
            }
        }

        let tensor = Tensor::new(data, Shape::new(IMAGE_SHAPE.to_vec()))
            .map_err(|e| SessionError::InvalidInput(e.to_string()))?;
        Ok(PrefillInput::Image(tensor))
    }
}

impl From<&str> for PrefillInput {
    fn from(text: &str) -> Self {
        PrefillInput::Text(text.to_string())
    }
}

impl From<String> for PrefillInput {
    fn from(text: String) -> Self {
        PrefillInput::Text(text)
    }
}

impl From<Tensor> for PrefillInput {
    fn from(image: Tensor) -> Self {
        PrefillInput::Image(image)
    }
}

/// Check an image tensor against [`IMAGE_SHAPE`] and normalize it to
/// unbatched f32.
pub(crate) fn prepare_image(image: Tensor) -> Result<Tensor> {
    let image = if image.shape().ndim() == IMAGE_SHAPE.len() + 1 {
        let squeezed = image
            .shape()
            .squeeze_leading()
            .map_err(|e| SessionError::InvalidInput(e.to_string()))?;
        image
            .reshape(squeezed)
            .map_err(|e| SessionError::InvalidInput(e.to_string()))?
    } else {
        image
    };
    image
        .shape()
        .ensure(&IMAGE_SHAPE)
        .map_err(|e| SessionError::InvalidInput(format!("image {}", e)))?;
    Ok(image.into_f32())
}

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No model loaded.
    Unloaded,
    /// Model loaded, no turn in progress.
    Loaded,
    /// A user turn is being assembled from one or more prefills.
    Prefilling,
    /// Generating the assistant reply.
    Decoding,
    /// The reply finished; see [`StopReason`].
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unloaded => "unloaded",
            SessionState::Loaded => "loaded",
            SessionState::Prefilling => "prefilling",
            SessionState::Decoding => "decoding",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Why a reply stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model sampled an end-of-sequence token.
    EndOfSequence,
    /// The reply contained one of the template's stop strings.
    StopString,
    /// The per-turn generation budget ran out.
    MaxGenLength,
    /// The KV cache is full.
    ContextWindow,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopReason::EndOfSequence => "end of sequence",
            StopReason::StopString => "stop string",
            StopReason::MaxGenLength => "max generation length",
            StopReason::ContextWindow => "context window full",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One part of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    /// An image; the pixels are not retained.
    Image,
}

/// A completed turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Content>,
}

impl Turn {
    /// Render the turn as text, writing `image_placeholder` for images.
    pub fn render(&self, image_placeholder: &str) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                Content::Text(text) => text.as_str(),
                Content::Image => image_placeholder,
            })
            .collect()
    }
}

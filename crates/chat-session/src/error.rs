use std::fmt;

use chat_backend::BackendError;
use thiserror::Error;

/// Step of `reload` that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Looking up the model identifier in the registry.
    Resolve,
    /// Reading the model directory's chat config.
    Config,
    /// Running the loader.
    Backend,
    /// Checking the backend and tokenizer agree.
    Validate,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStage::Resolve => "resolve",
            LoadStage::Config => "config",
            LoadStage::Backend => "backend",
            LoadStage::Validate => "validate",
        };
        f.write_str(name)
    }
}

/// Operation during which the backend faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStage {
    Prefill,
    Decode,
    Evaluate,
}

impl fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InferenceStage::Prefill => "prefill",
            InferenceStage::Decode => "decode",
            InferenceStage::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    /// The session is left unloaded; only a successful `reload` recovers.
    #[error("failed to load model '{model}' ({stage} stage): {source}")]
    Load {
        model: String,
        stage: LoadStage,
        #[source]
        source: BackendError,
    },
    #[error("no model loaded")]
    NotLoaded,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("generation already stopped; prefill a new turn or reset the chat")]
    AlreadyStopped,
    #[error("nothing to decode; prefill a prompt first")]
    NothingToDecode,
    /// The conversation has been discarded; the model stays loaded.
    #[error("inference failed during {stage}: {source}")]
    Inference {
        stage: InferenceStage,
        #[source]
        source: BackendError,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no backend registered for model '{name}' (known: {known:?})")]
    UnknownModel { name: String, known: Vec<String> },
    #[error("incompatible model: {0}")]
    Incompatible(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("forward pass failed: {0}")]
    Forward(String),
    #[error("out of memory: {0}")]
    OutOfMemory(String),
    #[error("operation not supported by this backend: {0}")]
    Unsupported(String),
    #[error("tensor error: {0}")]
    Tensor(#[from] chat_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, BackendError>;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },
    #[error("data length {len} does not match shape {shape:?} (numel={numel})")]
    LengthMismatch {
        len: usize,
        shape: Vec<usize>,
        numel: usize,
    },
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: String, got: String },
    #[error("cannot squeeze axis {axis} of size {size}")]
    NotSqueezable { axis: usize, size: usize },
}

pub type Result<T> = std::result::Result<T, TensorError>;

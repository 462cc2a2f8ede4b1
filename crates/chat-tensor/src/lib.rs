//! `chat-tensor` - host tensors for chat-runtime.
//!
//! This crate provides:
//! - A `Tensor` type holding contiguous, row-major f32 or f16 data
//! - Shape utilities (exact-shape checks, leading-axis squeeze)
//! - Data type definitions

pub mod dtype;
pub mod error;
pub mod shape;
pub mod storage;
pub mod tensor;

pub use dtype::DType;
pub use error::{Result, TensorError};
pub use shape::Shape;
pub use storage::HostStorage;
pub use tensor::Tensor;

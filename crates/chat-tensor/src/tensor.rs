use half::f16;

use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::storage::HostStorage;

/// A tensor backed by host storage.
///
/// Holds contiguous, row-major data with an associated shape. Construction
/// checks that the element count matches the shape, so a `Tensor` is always
/// internally consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    storage: HostStorage,
    shape: Shape,
}

impl Tensor {
    /// Create a tensor from f32 data and a shape.
    pub fn new(data: Vec<f32>, shape: Shape) -> Result<Self> {
        Self::from_storage(HostStorage::F32(data), shape)
    }

    /// Create a tensor from f16 data and a shape.
    pub fn from_f16(data: Vec<f16>, shape: Shape) -> Result<Self> {
        Self::from_storage(HostStorage::F16(data), shape)
    }

    /// Create a tensor from existing storage, checking the element count.
    pub fn from_storage(storage: HostStorage, shape: Shape) -> Result<Self> {
        if storage.len() != shape.numel() {
            return Err(TensorError::LengthMismatch {
                len: storage.len(),
                shape: shape.dims().to_vec(),
                numel: shape.numel(),
            });
        }
        Ok(Tensor { storage, shape })
    }

    /// Create a zero-filled f32 tensor with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        let n = shape.numel();
        Tensor {
            storage: HostStorage::F32(vec![0.0; n]),
            shape,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Borrow the data as f32. Fails for f16 tensors.
    pub fn data_f32(&self) -> Result<&[f32]> {
        self.storage.as_f32_slice()
    }

    /// Return an f32 tensor with the same shape, widening f16 data.
    pub fn into_f32(self) -> Tensor {
        Tensor {
            storage: self.storage.into_f32(),
            shape: self.shape,
        }
    }

    /// Reshape the tensor. The total number of elements must remain the same.
    pub fn reshape(self, new_shape: Shape) -> Result<Tensor> {
        if self.shape.numel() != new_shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape.dims().to_vec(),
                got: new_shape.dims().to_vec(),
            });
        }
        Ok(Tensor {
            storage: self.storage,
            shape: new_shape,
        })
    }
}

use half::f16;

use crate::dtype::DType;
use crate::error::{Result, TensorError};

/// Host-side tensor storage.
#[derive(Debug, Clone, PartialEq)]
pub enum HostStorage {
    /// 32-bit floating point storage.
    F32(Vec<f32>),
    /// 16-bit floating point storage.
    F16(Vec<f16>),
}

impl HostStorage {
    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        match self {
            HostStorage::F32(v) => v.len(),
            HostStorage::F16(v) => v.len(),
        }
    }

    /// Returns true if the storage contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            HostStorage::F32(_) => DType::F32,
            HostStorage::F16(_) => DType::F16,
        }
    }

    /// Borrow the data as an f32 slice.
    ///
    /// # Errors
    /// Returns `DTypeMismatch` if the storage holds f16 data; use
    /// [`HostStorage::into_f32`] to widen it first.
    pub fn as_f32_slice(&self) -> Result<&[f32]> {
        match self {
            HostStorage::F32(v) => Ok(v.as_slice()),
            HostStorage::F16(_) => Err(TensorError::DTypeMismatch {
                expected: DType::F32.to_string(),
                got: DType::F16.to_string(),
            }),
        }
    }

    /// Convert to f32 storage, widening f16 elements.
    pub fn into_f32(self) -> HostStorage {
        match self {
            HostStorage::F16(v) => HostStorage::F32(v.into_iter().map(f32::from).collect()),
            f32_storage => f32_storage,
        }
    }
}

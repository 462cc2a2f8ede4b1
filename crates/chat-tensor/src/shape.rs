use crate::error::{Result, TensorError};
use std::fmt;

/// A tensor shape, wrapping a vector of dimension sizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Fails with `ShapeMismatch` unless `self` equals `expected` exactly.
    pub fn ensure(&self, expected: &[usize]) -> Result<()> {
        if self.dims != expected {
            return Err(TensorError::ShapeMismatch {
                expected: expected.to_vec(),
                got: self.dims.clone(),
            });
        }
        Ok(())
    }

    /// Drop the leading axis, which must have size 1 (e.g. a batch of one).
    pub fn squeeze_leading(&self) -> Result<Shape> {
        match self.dims.first() {
            Some(1) => Ok(Shape::new(self.dims[1..].to_vec())),
            Some(&size) => Err(TensorError::NotSqueezable { axis: 0, size }),
            None => Err(TensorError::NotSqueezable { axis: 0, size: 0 }),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

use crate::error::{Result, TensorError};
use std::fmt;

/// An ordered list of dimension sizes.
///
/// A dimension may be zero, which makes the tensor zero-length. Rank zero is
/// representable here but rejected when a [`Tensor`](crate::Tensor) is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Create a shape from a slice of dimensions.
    pub fn from_slice(dims: &[usize]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }

    /// Convert signed ONNX dims, returning `None` if any dimension is negative
    /// or does not fit in `usize`.
    pub fn from_signed(dims: &[i64]) -> Option<Self> {
        dims.iter()
            .map(|&d| usize::try_from(d).ok())
            .collect::<Option<Vec<_>>>()
            .map(Shape::new)
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Same as [`numel`](Self::numel) but returns `None` on overflow, for
    /// shapes read from untrusted input.
    pub fn checked_numel(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    /// Returns a reference to the underlying dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Dims as signed integers, the form ONNX records store.
    pub fn to_signed(&self) -> Vec<i64> {
        self.dims.iter().map(|&d| d as i64).collect()
    }

    /// Row-major contiguous strides: `[d0, d1, d2]` gives `[d1*d2, d2, 1]`.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.dims.len()];
        for i in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Compute the broadcast shape of `a` and `b` using numpy-style rules:
    /// shapes are right-aligned, and each pair of dims must be equal or
    /// contain a 1.
    pub fn broadcast_shape(a: &Shape, b: &Shape) -> Result<Shape> {
        let ndim = a.ndim().max(b.ndim());
        let padded_a = a.left_padded(ndim);
        let padded_b = b.left_padded(ndim);

        let mut dims = Vec::with_capacity(ndim);
        for (&da, &db) in padded_a.iter().zip(&padded_b) {
            let d = match (da, db) {
                _ if da == db => da,
                (1, _) => db,
                (_, 1) => da,
                _ => {
                    return Err(TensorError::BroadcastError {
                        a: a.dims.clone(),
                        b: b.dims.clone(),
                    })
                }
            };
            dims.push(d);
        }
        Ok(Shape::new(dims))
    }

    /// Map a flat row-major index in the broadcast shape `out` back to a flat
    /// index into a tensor of this shape.
    ///
    /// `out` must be a valid broadcast target of `self`.
    pub fn broadcast_index(&self, out: &Shape, flat: usize) -> usize {
        let padded = self.left_padded(out.ndim());
        let src_strides = Shape::new(padded.clone()).strides();

        let mut rem = flat;
        let mut index = 0;
        for (axis, out_stride) in out.strides().into_iter().enumerate() {
            let coord = rem / out_stride;
            rem %= out_stride;
            if padded[axis] != 1 {
                index += coord * src_strides[axis];
            }
        }
        index
    }

    fn left_padded(&self, ndim: usize) -> Vec<usize> {
        let mut dims = vec![1usize; ndim - self.ndim()];
        dims.extend_from_slice(&self.dims);
        dims
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
        Shape::from_slice(dims)
    }
}

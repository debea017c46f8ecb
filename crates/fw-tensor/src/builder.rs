use crate::byte_order::ByteOrder;
use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Incremental tensor construction with explicit `put_*` calls.
///
/// Puts are chained; a put of the wrong element type is remembered and
/// reported by [`build`](Self::build), which also checks that exactly
/// `shape.numel()` elements were supplied.
///
/// ```
/// use fw_tensor::{ByteOrder, DType, Shape, TensorBuilder};
///
/// let x = TensorBuilder::new(DType::F32, Shape::new(vec![2, 1]), ByteOrder::LittleEndian)
///     .name("x2:0")
///     .put_f32(3.0)
///     .put_f32(2.0)
///     .build()
///     .unwrap();
/// assert_eq!(x.to_f32_vec().unwrap(), vec![3.0, 2.0]);
/// ```
#[derive(Debug)]
pub struct TensorBuilder {
    dtype: DType,
    shape: Shape,
    byte_order: ByteOrder,
    name: Option<String>,
    bytes: Vec<u8>,
    count: usize,
    error: Option<TensorError>,
}

macro_rules! put_method {
    ($fn_name:ident, $ty:ty, $dtype:expr) => {
        pub fn $fn_name(self, value: $ty) -> Self {
            let (le, be) = (value.to_le_bytes(), value.to_be_bytes());
            self.put($dtype, &le, &be)
        }
    };
}

impl TensorBuilder {
    pub fn new(dtype: DType, shape: Shape, byte_order: ByteOrder) -> Self {
        let capacity = shape.numel().saturating_mul(dtype.size_in_bytes());
        TensorBuilder {
            dtype,
            shape,
            byte_order,
            name: None,
            bytes: Vec::with_capacity(capacity),
            count: 0,
            error: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    put_method!(put_f32, f32, DType::F32);
    put_method!(put_f64, f64, DType::F64);
    put_method!(put_f16, half::f16, DType::F16);
    put_method!(put_i8, i8, DType::I8);
    put_method!(put_u8, u8, DType::U8);
    put_method!(put_i32, i32, DType::I32);
    put_method!(put_i64, i64, DType::I64);

    fn put(mut self, dtype: DType, le: &[u8], be: &[u8]) -> Self {
        if self.error.is_some() {
            return self;
        }
        if dtype != self.dtype {
            self.error = Some(TensorError::DTypeMismatch {
                expected: self.dtype,
                got: dtype,
            });
            return self;
        }
        match self.byte_order {
            ByteOrder::LittleEndian => self.bytes.extend_from_slice(le),
            ByteOrder::BigEndian => self.bytes.extend_from_slice(be),
        }
        self.count += 1;
        self
    }

    /// Finish the tensor.
    ///
    /// # Errors
    /// The first `DTypeMismatch` from a put, `ElementCount` when too few or
    /// too many elements were put, or any [`Tensor::from_bytes`] error.
    pub fn build(self) -> Result<Tensor> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let expected = self.shape.numel();
        if self.count != expected {
            return Err(TensorError::ElementCount {
                shape: self.shape.dims().to_vec(),
                expected,
                got: self.count,
            });
        }
        let tensor = Tensor::from_bytes(self.dtype, self.shape, self.byte_order, self.bytes)?;
        Ok(match self.name {
            Some(name) => tensor.with_name(name),
            None => tensor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_f32() {
        let t = TensorBuilder::new(DType::F32, Shape::new(vec![2, 1]), ByteOrder::BigEndian)
            .put_f32(3.0)
            .put_f32(2.0)
            .build()
            .unwrap();
        assert_eq!(t.byte_order(), ByteOrder::BigEndian);
        assert_eq!(&t.as_bytes()[..4], &3.0f32.to_be_bytes());
        assert_eq!(t.to_f32_vec().unwrap(), vec![3.0, 2.0]);
    }

    #[test]
    fn test_too_few_elements() {
        let err = TensorBuilder::new(DType::F32, Shape::new(vec![3]), ByteOrder::LittleEndian)
            .put_f32(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            TensorError::ElementCount {
                expected: 3,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_wrong_put_type() {
        let err = TensorBuilder::new(DType::I64, Shape::new(vec![1]), ByteOrder::LittleEndian)
            .put_f32(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, TensorError::DTypeMismatch { .. }));
    }

    #[test]
    fn test_name_carried() {
        let t = TensorBuilder::new(DType::U8, Shape::new(vec![2]), ByteOrder::LittleEndian)
            .name("pixels")
            .put_u8(0)
            .put_u8(255)
            .build()
            .unwrap();
        assert_eq!(t.name(), Some("pixels"));
        assert_eq!(t.value_f64(1), Some(255.0));
    }
}

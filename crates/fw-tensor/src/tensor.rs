use std::fmt;

use crate::byte_order::ByteOrder;
use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::shape::Shape;

/// Number of elements rendered by `Display` before the output is elided.
const DISPLAY_MAX_ELEMENTS: usize = 16;

/// A typed, shaped, byte-ordered buffer.
///
/// The buffer length always equals `shape.numel() * dtype.size_in_bytes()`
/// and the shape always has at least one dimension. There are no mutating
/// accessors: once built, a tensor is only read, cloned, moved or dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    name: Option<String>,
    dtype: DType,
    shape: Shape,
    byte_order: ByteOrder,
    bytes: Vec<u8>,
}

impl Tensor {
    /// Wrap raw element bytes already laid out in `byte_order`.
    ///
    /// # Errors
    /// `EmptyShape` for a rank-0 shape, `ByteLength` when the buffer does not
    /// hold exactly `numel` elements of `dtype`.
    pub fn from_bytes(
        dtype: DType,
        shape: Shape,
        byte_order: ByteOrder,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        if shape.ndim() == 0 {
            return Err(TensorError::EmptyShape);
        }
        let expected = shape
            .checked_numel()
            .and_then(|n| n.checked_mul(dtype.size_in_bytes()));
        if expected != Some(bytes.len()) {
            return Err(TensorError::ByteLength {
                dtype,
                shape: shape.dims().to_vec(),
                expected: expected.unwrap_or(usize::MAX),
                got: bytes.len(),
            });
        }
        Ok(Tensor {
            name: None,
            dtype,
            shape,
            byte_order,
            bytes,
        })
    }

    /// Create an f32 tensor from values, encoded in `byte_order`.
    pub fn from_f32(shape: Shape, data: &[f32], byte_order: ByteOrder) -> Result<Self> {
        let mut bytes = Vec::with_capacity(data.len() * 4);
        for &v in data {
            match byte_order {
                ByteOrder::LittleEndian => bytes.extend_from_slice(&v.to_le_bytes()),
                ByteOrder::BigEndian => bytes.extend_from_slice(&v.to_be_bytes()),
            }
        }
        Self::from_bytes(DType::F32, shape, byte_order, bytes)
    }

    /// Attach a tensor name (e.g. the graph input it is meant for).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// The raw element bytes, in [`byte_order`](Self::byte_order).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Bytes of element `i`, or `None` if `i` is out of range.
    fn element(&self, i: usize) -> Option<&[u8]> {
        let size = self.dtype.size_in_bytes();
        let start = i.checked_mul(size)?;
        let end = start.checked_add(size)?;
        self.bytes.get(start..end)
    }

    /// Element `i` (buffer order) widened to f64.
    ///
    /// Returns `None` if `i` is out of range.
    pub fn value_f64(&self, i: usize) -> Option<f64> {
        let chunk = self.element(i)?;
        Some(decode_element(self.dtype, self.byte_order, chunk))
    }

    /// Element `i` of an integer tensor, exactly.
    ///
    /// Returns `None` for floating point tensors and out of range `i`.
    pub fn value_i128(&self, i: usize) -> Option<i128> {
        if self.dtype.is_float() {
            return None;
        }
        let chunk = self.element(i)?;
        decode_integer(self.dtype, self.byte_order, chunk)
    }

    /// Iterate over every element in buffer order, widened to f64.
    pub fn iter_f64(&self) -> impl Iterator<Item = f64> + '_ {
        self.bytes
            .chunks_exact(self.dtype.size_in_bytes())
            .map(move |chunk| decode_element(self.dtype, self.byte_order, chunk))
    }

    /// Decode an f32 tensor into native values.
    ///
    /// # Errors
    /// `DTypeMismatch` if the tensor is not F32.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        if self.dtype != DType::F32 {
            return Err(TensorError::DTypeMismatch {
                expected: DType::F32,
                got: self.dtype,
            });
        }
        Ok(self
            .bytes
            .chunks_exact(4)
            .map(|c| {
                let b = [c[0], c[1], c[2], c[3]];
                match self.byte_order {
                    ByteOrder::LittleEndian => f32::from_le_bytes(b),
                    ByteOrder::BigEndian => f32::from_be_bytes(b),
                }
            })
            .collect())
    }

    /// Re-encode every element into `order`. Consumes the tensor; a tensor
    /// already in `order` is returned unchanged.
    pub fn to_byte_order(mut self, order: ByteOrder) -> Self {
        if self.byte_order.needs_swap(order) {
            let size = self.dtype.size_in_bytes();
            for chunk in self.bytes.chunks_exact_mut(size) {
                chunk.reverse();
            }
            self.byte_order = order;
        }
        self
    }
}

/// Decode one element of `dtype` stored in `order`.
///
/// `chunk` must be exactly `dtype.size_in_bytes()` long.
pub(crate) fn decode_element(dtype: DType, order: ByteOrder, chunk: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    let n = chunk.len();
    buf[..n].copy_from_slice(chunk);
    if order != ByteOrder::LittleEndian {
        buf[..n].reverse();
    }
    match dtype {
        DType::F32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
        DType::F16 => half::f16::from_le_bytes([buf[0], buf[1]]).to_f64(),
        DType::F64 => f64::from_le_bytes(buf),
        DType::I8 => buf[0] as i8 as f64,
        DType::U8 => buf[0] as f64,
        DType::I32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
        DType::I64 => i64::from_le_bytes(buf) as f64,
    }
}

fn decode_integer(dtype: DType, order: ByteOrder, chunk: &[u8]) -> Option<i128> {
    let mut buf = [0u8; 8];
    let n = chunk.len();
    buf[..n].copy_from_slice(chunk);
    if order != ByteOrder::LittleEndian {
        buf[..n].reverse();
    }
    match dtype {
        DType::I8 => Some(i128::from(buf[0] as i8)),
        DType::U8 => Some(i128::from(buf[0])),
        DType::I32 => Some(i128::from(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))),
        DType::I64 => Some(i128::from(i64::from_le_bytes(buf))),
        DType::F16 | DType::F32 | DType::F64 => None,
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor(")?;
        if let Some(name) = &self.name {
            write!(f, "{:?}, ", name)?;
        }
        write!(f, "{}, {}, {}, [", self.dtype, self.shape, self.byte_order)?;
        for (i, v) in self.iter_f64().take(DISPLAY_MAX_ELEMENTS).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        if self.numel() > DISPLAY_MAX_ELEMENTS {
            write!(f, ", ...")?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f32() {
        let t = Tensor::from_f32(
            Shape::new(vec![2, 1]),
            &[3.0, 2.0],
            ByteOrder::LittleEndian,
        )
        .unwrap();
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.numel(), 2);
        assert_eq!(t.as_bytes().len(), 8);
        assert_eq!(t.to_f32_vec().unwrap(), vec![3.0, 2.0]);
    }

    #[test]
    fn test_byte_length_mismatch() {
        let err = Tensor::from_bytes(
            DType::F32,
            Shape::new(vec![3]),
            ByteOrder::LittleEndian,
            vec![0u8; 8],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TensorError::ByteLength {
                expected: 12,
                got: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_shape_rejected() {
        let err = Tensor::from_bytes(
            DType::F32,
            Shape::new(vec![]),
            ByteOrder::LittleEndian,
            vec![0u8; 4],
        )
        .unwrap_err();
        assert!(matches!(err, TensorError::EmptyShape));
    }

    #[test]
    fn test_zero_length_tensor() {
        let t = Tensor::from_bytes(
            DType::F32,
            Shape::new(vec![0, 4]),
            ByteOrder::LittleEndian,
            vec![],
        )
        .unwrap();
        assert_eq!(t.numel(), 0);
        assert_eq!(t.iter_f64().count(), 0);
    }

    #[test]
    fn test_byte_order_conversion() {
        let le = Tensor::from_f32(Shape::new(vec![2]), &[1.5, -2.0], ByteOrder::LittleEndian)
            .unwrap();
        let be = le.clone().to_byte_order(ByteOrder::BigEndian);
        assert_eq!(be.byte_order(), ByteOrder::BigEndian);
        assert_eq!(&be.as_bytes()[..4], &1.5f32.to_be_bytes());
        assert_eq!(be.to_f32_vec().unwrap(), vec![1.5, -2.0]);
        assert_eq!(be.to_byte_order(ByteOrder::LittleEndian), le);
    }

    #[test]
    fn test_value_out_of_range() {
        let t = Tensor::from_f32(Shape::new(vec![2]), &[1.0, 2.0], ByteOrder::LittleEndian).unwrap();
        assert_eq!(t.value_f64(2), None);
        assert_eq!(t.value_f64(usize::MAX), None);
        assert_eq!(t.value_f64(usize::MAX / 2), None);
    }

    #[test]
    fn test_value_i128_is_exact() {
        let big = (1i64 << 53) + 1;
        let t = Tensor::from_bytes(
            DType::I64,
            Shape::new(vec![2]),
            ByteOrder::BigEndian,
            [i64::MIN.to_be_bytes(), big.to_be_bytes()].concat(),
        )
        .unwrap();
        assert_eq!(t.value_i128(0), Some(i128::from(i64::MIN)));
        assert_eq!(t.value_i128(1), Some(i128::from(big)));
        assert_eq!(t.value_i128(2), None);

        let f = Tensor::from_f32(Shape::new(vec![1]), &[1.0], ByteOrder::LittleEndian).unwrap();
        assert_eq!(f.value_i128(0), None);
    }

    #[test]
    fn test_value_f64_per_dtype() {
        let t = Tensor::from_bytes(
            DType::I64,
            Shape::new(vec![2]),
            ByteOrder::BigEndian,
            [(-7i64).to_be_bytes(), 9i64.to_be_bytes()].concat(),
        )
        .unwrap();
        assert_eq!(t.value_f64(0), Some(-7.0));
        assert_eq!(t.value_f64(1), Some(9.0));
        assert_eq!(t.value_f64(2), None);

        let h = Tensor::from_bytes(
            DType::F16,
            Shape::new(vec![1]),
            ByteOrder::LittleEndian,
            half::f16::from_f32(0.5).to_le_bytes().to_vec(),
        )
        .unwrap();
        assert_eq!(h.value_f64(0), Some(0.5));
    }

    #[test]
    fn test_to_f32_vec_wrong_dtype() {
        let t = Tensor::from_bytes(
            DType::U8,
            Shape::new(vec![2]),
            ByteOrder::LittleEndian,
            vec![1, 2],
        )
        .unwrap();
        assert!(t.to_f32_vec().is_err());
    }

    #[test]
    fn test_display_elides() {
        let data: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let t = Tensor::from_f32(Shape::new(vec![20]), &data, ByteOrder::LittleEndian)
            .unwrap()
            .with_name("y:0");
        let s = t.to_string();
        assert!(s.starts_with("Tensor(\"y:0\", f32, [20], little-endian, [0, 1"));
        assert!(s.ends_with(", ...])"));
    }
}

use std::fmt;

/// Element types a tensor buffer can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating point.
    F32,
    /// 16-bit floating point (IEEE 754 half-precision, via the `half` crate).
    F16,
    /// 64-bit floating point.
    F64,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
}

impl DType {
    /// Returns the size in bytes of a single element.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::I8 | DType::U8 => 1,
            DType::F16 => 2,
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 => 8,
        }
    }

    /// Converts an ONNX `TensorProto.DataType` tag to a `DType`.
    ///
    /// ONNX tags:
    /// - 1 => FLOAT
    /// - 2 => UINT8
    /// - 3 => INT8
    /// - 6 => INT32
    /// - 7 => INT64
    /// - 10 => FLOAT16
    /// - 11 => DOUBLE
    pub fn from_onnx_type(id: i32) -> Option<DType> {
        match id {
            1 => Some(DType::F32),
            2 => Some(DType::U8),
            3 => Some(DType::I8),
            6 => Some(DType::I32),
            7 => Some(DType::I64),
            10 => Some(DType::F16),
            11 => Some(DType::F64),
            _ => None,
        }
    }

    /// Returns the ONNX `TensorProto.DataType` tag for this `DType`.
    pub fn to_onnx_type(&self) -> i32 {
        match self {
            DType::F32 => 1,
            DType::U8 => 2,
            DType::I8 => 3,
            DType::I32 => 6,
            DType::I64 => 7,
            DType::F16 => 10,
            DType::F64 => 11,
        }
    }

    /// Returns true for the floating point types.
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F16 | DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F16 => write!(f, "f16"),
            DType::F64 => write!(f, "f64"),
            DType::I8 => write!(f, "i8"),
            DType::U8 => write!(f, "u8"),
            DType::I32 => write!(f, "i32"),
            DType::I64 => write!(f, "i64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [DType; 7] = [
        DType::F32,
        DType::F16,
        DType::F64,
        DType::I8,
        DType::U8,
        DType::I32,
        DType::I64,
    ];

    #[test]
    fn test_size_in_bytes() {
        assert_eq!(DType::F32.size_in_bytes(), 4);
        assert_eq!(DType::F16.size_in_bytes(), 2);
        assert_eq!(DType::F64.size_in_bytes(), 8);
        assert_eq!(DType::U8.size_in_bytes(), 1);
        assert_eq!(DType::I64.size_in_bytes(), 8);
    }

    #[test]
    fn test_onnx_tags() {
        for dtype in &ALL {
            let id = dtype.to_onnx_type();
            assert_eq!(DType::from_onnx_type(id), Some(*dtype));
        }
        assert_eq!(DType::from_onnx_type(1), Some(DType::F32));
    }

    #[test]
    fn test_onnx_unknown() {
        // STRING and BOOL have no buffer representation here.
        assert!(DType::from_onnx_type(8).is_none());
        assert!(DType::from_onnx_type(9).is_none());
        assert!(DType::from_onnx_type(0).is_none());
    }
}

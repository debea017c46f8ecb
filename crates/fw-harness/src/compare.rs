use std::fmt;

use fw_tensor::{DType, Shape, Tensor};

/// The first reason a comparison failed.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    TypeMismatch { expected: DType, actual: DType },
    ShapeMismatch { expected: Shape, actual: Shape },
    ElementCountMismatch { expected: usize, actual: usize },
    /// Element `index` differs by `diff`, or one side is NaN (`diff` is NaN).
    ToleranceExceeded {
        index: usize,
        expected: f64,
        actual: f64,
        diff: f64,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::TypeMismatch { expected, actual } => {
                write!(f, "dtype mismatch: expected {}, got {}", expected, actual)
            }
            Mismatch::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {}, got {}", expected, actual)
            }
            Mismatch::ElementCountMismatch { expected, actual } => {
                write!(f, "element count mismatch: expected {}, got {}", expected, actual)
            }
            Mismatch::ToleranceExceeded {
                index,
                expected,
                actual,
                diff,
            } => write!(
                f,
                "element {} differs: expected {}, got {} (|diff| = {})",
                index, expected, actual, diff
            ),
        }
    }
}

/// Outcome of comparing one actual tensor against its expected tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub passed: bool,
    /// Largest element-wise absolute difference. NaN if any pair involved a
    /// NaN; `+inf` when a structural mismatch stopped the comparison.
    pub max_abs_diff: f64,
    pub shape_match: bool,
    pub dtype_match: bool,
    pub element_count_match: bool,
    pub mismatch: Option<Mismatch>,
}

impl ComparisonResult {
    fn structural(actual: &Tensor, expected: &Tensor, mismatch: Mismatch) -> Self {
        ComparisonResult {
            passed: false,
            max_abs_diff: f64::INFINITY,
            shape_match: actual.shape() == expected.shape(),
            dtype_match: actual.dtype() == expected.dtype(),
            element_count_match: actual.numel() == expected.numel(),
            mismatch: Some(mismatch),
        }
    }
}

/// Compare `actual` against `expected` element by element.
///
/// Data types and shapes must match exactly. Elements are then paired in
/// buffer order (each decoded with its own tensor's byte order) and the
/// comparison fails if any `|actual - expected|` exceeds `tolerance`. There is
/// no relative mode. NaN never compares equal, not even to NaN. Zero-length
/// tensors of matching type and shape pass.
pub fn compare(actual: &Tensor, expected: &Tensor, tolerance: f64) -> ComparisonResult {
    if actual.dtype() != expected.dtype() {
        let mismatch = Mismatch::TypeMismatch {
            expected: expected.dtype(),
            actual: actual.dtype(),
        };
        return ComparisonResult::structural(actual, expected, mismatch);
    }
    if actual.shape() != expected.shape() {
        let mismatch = Mismatch::ShapeMismatch {
            expected: expected.shape().clone(),
            actual: actual.shape().clone(),
        };
        return ComparisonResult::structural(actual, expected, mismatch);
    }
    if actual.numel() != expected.numel() {
        let mismatch = Mismatch::ElementCountMismatch {
            expected: expected.numel(),
            actual: actual.numel(),
        };
        return ComparisonResult::structural(actual, expected, mismatch);
    }

    let mut max_abs_diff = 0.0f64;
    let mut mismatch = None;
    for index in 0..actual.numel() {
        let Some((a, e, diff)) = element_diff(actual, expected, index) else {
            break;
        };
        if diff.is_nan() {
            max_abs_diff = f64::NAN;
        } else if diff > max_abs_diff {
            max_abs_diff = diff;
        }
        // Written so that a NaN diff or a NaN tolerance fails.
        if mismatch.is_none() && !(diff <= tolerance) {
            mismatch = Some(Mismatch::ToleranceExceeded {
                index,
                expected: e,
                actual: a,
                diff,
            });
        }
    }

    ComparisonResult {
        passed: mismatch.is_none(),
        max_abs_diff,
        shape_match: true,
        dtype_match: true,
        element_count_match: true,
        mismatch,
    }
}

/// `(actual, expected, |actual - expected|)` for element `index`.
///
/// Integer elements are subtracted exactly before widening. Equal floats,
/// including equal infinities, differ by zero; NaN is unequal to everything.
fn element_diff(actual: &Tensor, expected: &Tensor, index: usize) -> Option<(f64, f64, f64)> {
    if let (Some(a), Some(e)) = (actual.value_i128(index), expected.value_i128(index)) {
        return Some((a as f64, e as f64, (a - e).unsigned_abs() as f64));
    }
    let a = actual.value_f64(index)?;
    let e = expected.value_f64(index)?;
    let diff = if a == e { 0.0 } else { (a - e).abs() };
    Some((a, e, diff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_tensor::ByteOrder;
    use proptest::prelude::*;

    fn f32_tensor(dims: &[usize], data: &[f32]) -> Tensor {
        Tensor::from_f32(Shape::from_slice(dims), data, ByteOrder::LittleEndian).unwrap()
    }

    #[test]
    fn test_within_tolerance() {
        let a = f32_tensor(&[1, 3], &[1.0, 2.0, 3.0]);
        let b = f32_tensor(&[1, 3], &[1.0005, 2.0, 2.9995]);
        let r = compare(&a, &b, 0.001);
        assert!(r.passed);
        assert!(r.shape_match && r.dtype_match);
        assert!(r.max_abs_diff > 0.0004 && r.max_abs_diff < 0.0006);
        assert_eq!(r.mismatch, None);
    }

    #[test]
    fn test_tolerance_exceeded_reports_first_index() {
        let a = f32_tensor(&[4], &[0.0, 1.0, 5.0, 9.0]);
        let b = f32_tensor(&[4], &[0.0, 1.5, 5.0, 0.0]);
        let r = compare(&a, &b, 0.1);
        assert!(!r.passed);
        assert_eq!(r.max_abs_diff, 9.0);
        match r.mismatch {
            Some(Mismatch::ToleranceExceeded { index, diff, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(diff, 0.5);
            }
            other => panic!("unexpected mismatch {other:?}"),
        }
    }

    #[test]
    fn test_nan_never_equals_nan() {
        let a = f32_tensor(&[2], &[1.0, f32::NAN]);
        let r = compare(&a, &a, f64::INFINITY);
        assert!(!r.passed);
        assert!(r.max_abs_diff.is_nan());
        assert!(matches!(
            r.mismatch,
            Some(Mismatch::ToleranceExceeded { index: 1, .. })
        ));
    }

    #[test]
    fn test_infinities_equal_themselves() {
        let a = f32_tensor(&[3], &[1.0, f32::INFINITY, f32::NEG_INFINITY]);
        let r = compare(&a, &a.clone(), 0.001);
        assert!(r.passed, "{:?}", r.mismatch);
        assert_eq!(r.max_abs_diff, 0.0);

        let b = f32_tensor(&[3], &[1.0, f32::INFINITY, f32::INFINITY]);
        let r = compare(&a, &b, 1.0e30);
        assert!(!r.passed);
        assert_eq!(r.max_abs_diff, f64::INFINITY);
        assert!(matches!(
            r.mismatch,
            Some(Mismatch::ToleranceExceeded { index: 2, .. })
        ));
    }

    fn i64_tensor(data: &[i64]) -> Tensor {
        let bytes = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        Tensor::from_bytes(DType::I64, Shape::new(vec![data.len()]), ByteOrder::LittleEndian, bytes)
            .unwrap()
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let a = i64_tensor(&[1 << 53]);
        let b = i64_tensor(&[(1 << 53) + 1]);
        let r = compare(&a, &b, 0.0);
        assert!(!r.passed);
        assert_eq!(r.max_abs_diff, 1.0);
        assert!(compare(&a, &b, 1.0).passed);

        let r = compare(&i64_tensor(&[i64::MIN]), &i64_tensor(&[i64::MAX]), 0.0);
        assert!(!r.passed);
        assert_eq!(r.max_abs_diff, u64::MAX as f64);
    }

    #[test]
    fn test_shape_mismatch_with_infinite_tolerance() {
        let a = f32_tensor(&[2, 1], &[1.0, 2.0]);
        let b = f32_tensor(&[1, 2], &[1.0, 2.0]);
        let r = compare(&a, &b, f64::INFINITY);
        assert!(!r.passed);
        assert!(!r.shape_match);
        assert!(r.dtype_match);
        assert!(r.element_count_match);
        assert!(matches!(r.mismatch, Some(Mismatch::ShapeMismatch { .. })));
    }

    #[test]
    fn test_dtype_mismatch() {
        let a = f32_tensor(&[1], &[1.0]);
        let b = Tensor::from_bytes(
            DType::I32,
            Shape::new(vec![1]),
            ByteOrder::LittleEndian,
            1i32.to_le_bytes().to_vec(),
        )
        .unwrap();
        let r = compare(&a, &b, 10.0);
        assert!(!r.passed && !r.dtype_match && r.shape_match);
        assert_eq!(
            r.mismatch,
            Some(Mismatch::TypeMismatch {
                expected: DType::I32,
                actual: DType::F32
            })
        );
    }

    #[test]
    fn test_zero_length_passes() {
        let a = f32_tensor(&[0], &[]);
        let r = compare(&a, &a.clone(), 0.0);
        assert!(r.passed);
        assert_eq!(r.max_abs_diff, 0.0);
    }

    #[test]
    fn test_mixed_byte_orders_compare_by_value() {
        let le = f32_tensor(&[2], &[0.5, -8.25]);
        let be = le.clone().to_byte_order(ByteOrder::BigEndian);
        let r = compare(&le, &be, 0.0);
        assert!(r.passed);
    }

    #[test]
    fn test_negative_tolerance_fails() {
        let a = f32_tensor(&[1], &[1.0]);
        assert!(!compare(&a, &a, -1.0).passed);
    }

    fn finite_vec() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-1.0e6f32..1.0e6f32, 1..64)
    }

    /// Any value except NaN, infinities included.
    fn non_nan_vec() -> impl Strategy<Value = Vec<f32>> {
        let element = prop_oneof![
            8 => -1.0e6f32..1.0e6f32,
            1 => Just(f32::INFINITY),
            1 => Just(f32::NEG_INFINITY),
            1 => Just(f32::MAX),
        ];
        prop::collection::vec(element, 1..64)
    }

    proptest! {
        #[test]
        fn prop_reflexive(data in non_nan_vec(), tolerance in 0.0f64..10.0) {
            let t = f32_tensor(&[data.len()], &data);
            let r = compare(&t, &t, tolerance);
            prop_assert!(r.passed);
            prop_assert_eq!(r.max_abs_diff, 0.0);
        }

        #[test]
        fn prop_symmetric(pairs in prop::collection::vec((-1.0e3f32..1.0e3f32, -1.0e3f32..1.0e3f32), 1..64),
                          tolerance in 0.0f64..1.0) {
            let (xs, ys): (Vec<f32>, Vec<f32>) = pairs.into_iter().unzip();
            let a = f32_tensor(&[xs.len()], &xs);
            let b = f32_tensor(&[ys.len()], &ys);
            let ab = compare(&a, &b, tolerance);
            let ba = compare(&b, &a, tolerance);
            prop_assert_eq!(ab.passed, ba.passed);
            prop_assert_eq!(ab.max_abs_diff, ba.max_abs_diff);
        }

        #[test]
        fn prop_shape_mismatch_always_fails(data in finite_vec()) {
            let n = data.len();
            let a = f32_tensor(&[n, 1], &data);
            let b = f32_tensor(&[1, n], &data);
            let r = compare(&a, &b, f64::INFINITY);
            // [1, 1] vs [1, 1] is the one case where the shapes agree
            prop_assert_eq!(r.passed, n == 1);
        }
    }
}

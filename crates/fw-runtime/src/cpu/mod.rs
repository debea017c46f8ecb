pub mod graph;
pub mod wide;

pub use graph::{GraphBackend, GraphSession};
pub use wide::WideKernels;

use fw_tensor::{Result, TensorError};

use crate::kernels::Kernels;

/// Pure-Rust f32 kernels.
///
/// Straightforward loops with f32 accumulation, optimized for correctness
/// rather than peak performance. Registered as the `cpu` backend.
#[derive(Debug, Clone, Default)]
pub struct CpuKernels;

impl CpuKernels {
    pub fn new() -> Self {
        CpuKernels
    }
}

pub(crate) fn check_matmul(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<()> {
    if a.len() != m * k {
        return Err(TensorError::Other(format!(
            "matmul: a.len()={} but expected m*k={}",
            a.len(),
            m * k
        )));
    }
    if b.len() != k * n {
        return Err(TensorError::Other(format!(
            "matmul: b.len()={} but expected k*n={}",
            b.len(),
            k * n
        )));
    }
    Ok(())
}

pub(crate) fn check_same_len(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(TensorError::ShapeMismatch {
            expected: vec![a.len()],
            got: vec![b.len()],
        });
    }
    Ok(())
}

pub(crate) fn check_rows(x: &[f32], row_len: usize) -> Result<()> {
    if row_len == 0 {
        return Err(TensorError::Other(
            "softmax: row length must be > 0".to_string(),
        ));
    }
    if x.len() % row_len != 0 {
        return Err(TensorError::Other(format!(
            "softmax: x.len()={} is not a multiple of row length {}",
            x.len(),
            row_len
        )));
    }
    Ok(())
}

impl Kernels for CpuKernels {
    fn name(&self) -> &str {
        "cpu"
    }

    fn matmul(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>> {
        check_matmul(a, b, m, k, n)?;

        let mut c = vec![0.0f32; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0f32;
                for p in 0..k {
                    sum += a[i * k + p] * b[p * n + j];
                }
                c[i * n + j] = sum;
            }
        }
        Ok(c)
    }

    fn add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        check_same_len(a, b)?;
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x + y).collect())
    }

    fn mul(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        check_same_len(a, b)?;
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).collect())
    }

    fn relu(&self, x: &[f32]) -> Vec<f32> {
        x.iter().map(|&v| v.max(0.0)).collect()
    }

    fn softmax(&self, x: &[f32], row_len: usize) -> Result<Vec<f32>> {
        check_rows(x, row_len)?;

        let mut result = vec![0.0f32; x.len()];
        for (row, out) in x.chunks_exact(row_len).zip(result.chunks_exact_mut(row_len)) {
            // Find max for numerical stability
            let max_val = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);

            let mut sum = 0.0f32;
            for (o, &v) in out.iter_mut().zip(row) {
                *o = (v - max_val).exp();
                sum += *o;
            }
            for o in out.iter_mut() {
                *o /= sum;
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernels() -> CpuKernels {
        CpuKernels::new()
    }

    #[test]
    fn test_matmul_identity() {
        let k = kernels();
        let a = vec![1.0, 0.0, 0.0, 1.0];
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let c = k.matmul(&a, &x, 2, 2, 2).unwrap();
        assert_eq!(c, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_matmul_row_by_column() {
        let k = kernels();
        // [0.5, 2] @ [3; 2] = [5.5]
        let c = k.matmul(&[0.5, 2.0], &[3.0, 2.0], 1, 2, 1).unwrap();
        assert_eq!(c, vec![5.5]);
    }

    #[test]
    fn test_matmul_length_mismatch() {
        let k = kernels();
        assert!(k.matmul(&[1.0, 2.0, 3.0], &[1.0], 1, 2, 1).is_err());
    }

    #[test]
    fn test_add_mul() {
        let k = kernels();
        assert_eq!(k.add(&[1.0, 2.0], &[3.0, 4.0]).unwrap(), vec![4.0, 6.0]);
        assert_eq!(k.mul(&[2.0, 3.0], &[4.0, 5.0]).unwrap(), vec![8.0, 15.0]);
        assert!(k.add(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_relu() {
        assert_eq!(kernels().relu(&[-1.0, 0.0, 2.5]), vec![0.0, 0.0, 2.5]);
    }

    #[test]
    fn test_softmax_rows() {
        let k = kernels();
        let r = k.softmax(&[1.0, 2.0, 3.0, 0.0, 0.0, 0.0], 3).unwrap();
        let first: f32 = r[..3].iter().sum();
        assert!((first - 1.0).abs() < 1e-6);
        assert!(r[0] < r[1] && r[1] < r[2]);
        for v in &r[3..] {
            assert!((v - 1.0 / 3.0).abs() < 1e-6);
        }
        assert!(k.softmax(&[1.0, 2.0], 0).is_err());
        assert!(k.softmax(&[1.0, 2.0], 3).is_err());
    }
}

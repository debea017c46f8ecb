use fw_tensor::Result;

use super::{check_matmul, check_rows, check_same_len};
use crate::kernels::Kernels;

/// Kernels that accumulate in f64 and round once per output element.
///
/// Registered as the `cpu-f64` backend. Produces the same graph semantics as
/// [`CpuKernels`](super::CpuKernels) with a different rounding path, which is
/// what makes it useful as a second opinion in golden-output checks.
#[derive(Debug, Clone, Default)]
pub struct WideKernels;

impl WideKernels {
    pub fn new() -> Self {
        WideKernels
    }
}

impl Kernels for WideKernels {
    fn name(&self) -> &str {
        "cpu-f64"
    }

    fn matmul(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>> {
        check_matmul(a, b, m, k, n)?;

        let mut c = vec![0.0f32; m * n];
        // Loop order i-p-j walks `b` row-wise.
        let mut acc = vec![0.0f64; n];
        for i in 0..m {
            acc.iter_mut().for_each(|v| *v = 0.0);
            for p in 0..k {
                let av = a[i * k + p] as f64;
                let b_row = &b[p * n..(p + 1) * n];
                for (s, &bv) in acc.iter_mut().zip(b_row) {
                    *s += av * bv as f64;
                }
            }
            for (dst, &s) in c[i * n..(i + 1) * n].iter_mut().zip(&acc) {
                *dst = s as f32;
            }
        }
        Ok(c)
    }

    fn add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        check_same_len(a, b)?;
        Ok(a.iter()
            .zip(b)
            .map(|(&x, &y)| (x as f64 + y as f64) as f32)
            .collect())
    }

    fn mul(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        check_same_len(a, b)?;
        Ok(a.iter()
            .zip(b)
            .map(|(&x, &y)| (x as f64 * y as f64) as f32)
            .collect())
    }

    fn relu(&self, x: &[f32]) -> Vec<f32> {
        x.iter().map(|&v| if v > 0.0 { v } else { 0.0 }).collect()
    }

    fn softmax(&self, x: &[f32], row_len: usize) -> Result<Vec<f32>> {
        check_rows(x, row_len)?;

        let mut result = Vec::with_capacity(x.len());
        for row in x.chunks_exact(row_len) {
            let max_val = row.iter().map(|&v| v as f64).fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = row.iter().map(|&v| (v as f64 - max_val).exp()).collect();
            let sum: f64 = exps.iter().sum();
            result.extend(exps.iter().map(|e| (e / sum) as f32));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuKernels;
    use approx::assert_relative_eq;

    #[test]
    fn test_matmul_matches_f32_kernels() {
        let a: Vec<f32> = (0..12).map(|i| i as f32 * 0.25 - 1.0).collect();
        let b: Vec<f32> = (0..8).map(|i| 1.0 / (i as f32 + 1.0)).collect();
        let wide = WideKernels::new().matmul(&a, &b, 3, 4, 2).unwrap();
        let narrow = CpuKernels::new().matmul(&a, &b, 3, 4, 2).unwrap();
        for (w, n) in wide.iter().zip(&narrow) {
            assert_relative_eq!(*w, *n, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_softmax_matches_f32_kernels() {
        let x = [0.1, -3.0, 7.5, 2.0];
        let wide = WideKernels::new().softmax(&x, 4).unwrap();
        let narrow = CpuKernels::new().softmax(&x, 4).unwrap();
        for (w, n) in wide.iter().zip(&narrow) {
            assert_relative_eq!(*w, *n, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_relu_negative_zero() {
        let r = WideKernels::new().relu(&[-0.0, -2.0, 1.0]);
        assert_eq!(r, vec![0.0, 0.0, 1.0]);
    }
}

use std::fmt::Debug;

use fw_tensor::Result;

/// Numeric kernels behind a reference engine.
///
/// All operations work on contiguous row-major f32 slices and return owned
/// vectors. Broadcasting and shape bookkeeping happen in the graph executor;
/// element-wise kernels always receive equal-length operands.
pub trait Kernels: Send + Sync + Debug + Clone + 'static {
    /// Returns the backend name these kernels are registered under.
    fn name(&self) -> &str;

    /// Matrix multiplication: C = A @ B.
    ///
    /// - `a`: row-major data of shape [m, k]
    /// - `b`: row-major data of shape [k, n]
    /// - Returns: row-major data of shape [m, n]
    fn matmul(&self, a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Result<Vec<f32>>;

    /// Element-wise addition: result[i] = a[i] + b[i].
    fn add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>>;

    /// Element-wise multiplication: result[i] = a[i] * b[i].
    fn mul(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>>;

    /// result[i] = max(x[i], 0).
    fn relu(&self, x: &[f32]) -> Vec<f32>;

    /// Softmax over consecutive rows of `row_len` elements.
    fn softmax(&self, x: &[f32], row_len: usize) -> Result<Vec<f32>>;
}

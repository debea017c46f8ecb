use std::fmt::Debug;

use fw_tensor::Tensor;

use crate::error::Result;
use crate::model::ModelHandle;

/// An interchangeable execution capability that can run a model.
///
/// Backends are looked up by id in a [`BackendRegistry`](crate::BackendRegistry)
/// and have exactly one job: open a session against a model handle.
pub trait Backend: Send + Sync + Debug {
    /// Returns the id this backend is registered under (e.g. "cpu").
    fn name(&self) -> &str;

    /// Open a single-use execution context bound to `model`.
    fn open_session<'m>(&self, model: &'m ModelHandle) -> Result<Box<dyn BackendSession + 'm>>;
}

/// The backend side of a [`Session`](crate::Session).
///
/// Callers never hold one of these directly; the `Session` wrapper makes
/// sure [`release`](Self::release) runs exactly once.
pub trait BackendSession {
    /// Bind `tensor` to the model input `name`.
    fn feed(&mut self, name: &str, tensor: Tensor) -> Result<()>;

    /// Execute the model over the fed inputs.
    fn forward(&mut self) -> Result<()>;

    /// Fetch the output `name` produced by the last `forward`.
    fn output(&mut self, name: &str) -> Result<Tensor>;

    /// Free backend resources. Default implementation does nothing.
    fn release(&mut self) {}
}

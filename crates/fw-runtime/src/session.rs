use fw_tensor::{Tensor, TensorError};
use tracing::debug;

use crate::backend::{Backend, BackendSession};
use crate::error::Result;
use crate::model::ModelHandle;

/// A scoped execution context bound to one backend and one model.
///
/// The session is owned by exactly one caller. It is released when
/// [`release`](Self::release) is called or when it is dropped, whichever
/// comes first, so every exit path (including a failed `forward`) frees
/// the backend resources.
///
/// ```no_run
/// # fn run(backend: &dyn fw_runtime::Backend, model: &fw_runtime::ModelHandle, x: fw_tensor::Tensor)
/// # -> fw_runtime::Result<()> {
/// use fw_runtime::Session;
///
/// let mut session = Session::open(backend, model)?;
/// let y = session.feed("x2:0", x)?.forward()?.output("y:0")?;
/// # let _ = y;
/// # Ok(())
/// # }
/// ```
pub struct Session<'m> {
    backend: String,
    debug: bool,
    inner: Box<dyn BackendSession + 'm>,
    released: bool,
}

impl<'m> Session<'m> {
    pub fn open(backend: &dyn Backend, model: &'m ModelHandle) -> Result<Self> {
        let inner = backend.open_session(model)?;
        debug!(backend = backend.name(), model = %model.path().display(), "session opened");
        Ok(Session {
            backend: backend.name().to_string(),
            debug: model.config().debug,
            inner,
            released: false,
        })
    }

    /// Name of the backend this session runs on.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Bind `tensor` to the model input `name`. The tensor is moved into the
    /// session.
    pub fn feed(&mut self, name: &str, tensor: Tensor) -> Result<&mut Self> {
        if self.debug {
            debug!(backend = %self.backend, input = name, tensor = %tensor, "feed");
        }
        self.inner.feed(name, tensor)?;
        Ok(self)
    }

    /// Feed a tensor under its own name.
    ///
    /// # Errors
    /// Fails if the tensor carries no name.
    pub fn feed_named(&mut self, tensor: Tensor) -> Result<&mut Self> {
        let name = tensor
            .name()
            .map(str::to_string)
            .ok_or_else(|| TensorError::Other("fed tensor has no name".to_string()))?;
        self.feed(&name, tensor)
    }

    pub fn forward(&mut self) -> Result<&mut Self> {
        self.inner.forward()?;
        Ok(self)
    }

    pub fn output(&mut self, name: &str) -> Result<Tensor> {
        let tensor = self.inner.output(name)?;
        if self.debug {
            debug!(backend = %self.backend, output = name, tensor = %tensor, "output");
        }
        Ok(tensor)
    }

    /// Release the session now instead of at end of scope.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.release();
            debug!(backend = %self.backend, "session released");
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.release_inner();
    }
}

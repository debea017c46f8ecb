use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("unknown backend '{id}' (registered: {registered:?})")]
    UnknownBackend { id: String, registered: Vec<String> },
    #[error("failed to load model {path}: {reason}")]
    ModelLoadFailed { path: PathBuf, reason: String },
    #[error("model has no input named '{0}'")]
    UnknownInput(String),
    #[error("input '{0}' was not fed before forward")]
    MissingInput(String),
    #[error("model has no output named '{0}'")]
    UnknownOutput(String),
    #[error("output '{0}' requested before forward")]
    NotExecuted(String),
    #[error("backend '{backend}' failed: {reason}")]
    Execution { backend: String, reason: String },
    #[error("tensor error: {0}")]
    Tensor(#[from] fw_tensor::TensorError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

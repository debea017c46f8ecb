use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("fixture not found: {path}")]
    FixtureNotFound { path: PathBuf },
    #[error("malformed fixture {path}: {reason}")]
    MalformedFixture { path: PathBuf, reason: String },
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FixtureError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        FixtureError::MalformedFixture {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            FixtureError::FixtureNotFound { path }
        } else {
            FixtureError::Io { path, source }
        }
    }
}

/// Why a (backend, fixture) cell produced no comparison.
#[derive(Error, Debug)]
pub enum CellError {
    #[error("backend '{backend}' is not registered")]
    UnknownBackend { backend: String },
    #[error("backend '{backend}' failed on fixture {fixture}: {source}")]
    BackendExecutionFailed {
        backend: String,
        fixture: usize,
        #[source]
        source: fw_runtime::RuntimeError,
    },
}

pub type Result<T> = std::result::Result<T, FixtureError>;

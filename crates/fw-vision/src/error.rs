use fw_runtime::RuntimeError;
use fw_tensor::TensorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid target resolution {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),
}

/// A failed forward request.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, VisionError>;

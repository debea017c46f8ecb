//! `fw-vision` - Image input for forwarder models.
//!
//! This crate provides:
//! - `ImagePreprocessor`: encoded image bytes to a `[1, 1, h, w]` luminance tensor
//! - `decode_base64_image`: strict base64 for image payloads
//! - `ForwardService`: base64 image in, model output out, on a named backend

pub mod error;
pub mod payload;
pub mod preprocess;
pub mod service;

pub use error::{Result, ServiceError, VisionError};
pub use payload::decode_base64_image;
pub use preprocess::{preprocess, ImagePreprocessor};
pub use service::ForwardService;

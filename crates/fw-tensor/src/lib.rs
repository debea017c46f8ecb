//! `fw-tensor` - Typed, shaped, byte-ordered tensor buffers for forwarder.
//!
//! This crate provides:
//! - A `Tensor` type owning raw element bytes in a declared byte order
//! - A `TensorBuilder` for element-by-element construction
//! - Shape utilities and broadcasting
//! - Data type definitions matching the ONNX tensor element types

pub mod builder;
pub mod byte_order;
pub mod dtype;
pub mod error;
pub mod shape;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use builder::TensorBuilder;
pub use byte_order::ByteOrder;
pub use dtype::DType;
pub use error::{Result, TensorError};
pub use shape::Shape;
pub use tensor::Tensor;

//! `fw-runtime` - Backend and session contracts for forwarder.
//!
//! This crate provides:
//! - A `Backend` trait: open a scoped `Session` against a `ModelHandle`
//! - A `Session` wrapper that always releases backend resources
//! - A `BackendRegistry` mapping backend ids to factories
//! - Two reference CPU engines (`cpu`, `cpu-f64`) over pluggable `Kernels`

pub mod backend;
pub mod config;
pub mod cpu;
pub mod error;
pub mod kernels;
pub mod model;
pub mod registry;
pub mod session;

pub use backend::{Backend, BackendSession};
pub use config::{Config, ConfigBuilder};
pub use cpu::{CpuKernels, GraphBackend, WideKernels};
pub use error::{Result, RuntimeError};
pub use kernels::Kernels;
pub use model::{ModelHandle, ValueInfo};
pub use registry::{BackendFactory, BackendRegistry};
pub use session::Session;

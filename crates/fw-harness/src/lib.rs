//! `fw-harness` - Golden-output verification for forwarder backends.
//!
//! This crate provides:
//! - `FixtureLoader`: ONNX `TensorProto` fixture files to `Tensor`
//! - `compare`: absolute-tolerance tensor equivalence
//! - `MultiBackendRunner`: every fixture through every backend, one scoped
//!   session per cell

pub mod compare;
pub mod error;
pub mod fixture;
pub mod proto;
pub mod runner;

pub use compare::{compare, ComparisonResult, Mismatch};
pub use error::{CellError, FixtureError, Result};
pub use fixture::{
    encode_fixture, encode_record, FixtureLoader, FixturePair, FixtureRecord, PayloadField, RecordLayout,
};
pub use runner::{Cell, MultiBackendRunner, RunReport};

//! Loaded model handles.
//!
//! The reference engines in this crate execute a small JSON model
//! description:
//!
//! ```json
//! {
//!   "opset": 8,
//!   "inputs": [{ "name": "x2:0", "shape": [2, 1] }],
//!   "outputs": [{ "name": "y:0" }],
//!   "initializers": { "w": { "shape": [1, 2], "data": [0.5, 2.0] } },
//!   "nodes": [{ "op": "MatMul", "inputs": ["w", "x2:0"], "output": "y:0" }]
//! }
//! ```
//!
//! A [`ModelHandle`] is never mutated after loading and is shared read-only
//! between backends.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use fw_tensor::{DType, Shape};
use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, RuntimeError};

/// A declared graph input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueInfo {
    pub name: String,
    pub dtype: DType,
    /// `None` when the description leaves the shape open.
    pub shape: Option<Shape>,
}

/// A constant tensor baked into the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    pub shape: Shape,
    pub data: Vec<f32>,
}

/// Operators understood by the reference engines.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op")]
pub enum Op {
    /// 2-D matrix product of `inputs[0]` and `inputs[1]`.
    MatMul,
    /// Broadcasting element-wise sum.
    Add,
    /// Broadcasting element-wise product.
    Mul,
    Relu,
    /// Softmax over the last axis.
    Softmax,
    /// Reinterpret with a new shape of the same element count.
    Reshape { shape: Vec<usize> },
}

impl Op {
    fn arity(&self) -> usize {
        match self {
            Op::MatMul | Op::Add | Op::Mul => 2,
            Op::Relu | Op::Softmax | Op::Reshape { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub op: Op,
    pub inputs: Vec<String>,
    pub output: String,
}

#[derive(Deserialize)]
struct ModelDesc {
    opset: u32,
    inputs: Vec<ValueDesc>,
    outputs: Vec<ValueDesc>,
    #[serde(default)]
    initializers: BTreeMap<String, InitializerDesc>,
    nodes: Vec<Node>,
}

#[derive(Deserialize)]
struct ValueDesc {
    name: String,
    #[serde(default)]
    shape: Option<Vec<usize>>,
}

#[derive(Deserialize)]
struct InitializerDesc {
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// An opaque, loaded model: declared inputs/outputs, opset version and the
/// graph the reference engines execute.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    path: PathBuf,
    config: Config,
    opset: u32,
    inputs: Vec<ValueInfo>,
    outputs: Vec<ValueInfo>,
    initializers: BTreeMap<String, Initializer>,
    nodes: Vec<Node>,
}

impl ModelHandle {
    /// Read and validate a model description from disk.
    ///
    /// # Errors
    /// `ModelLoadFailed` naming `path` for unreadable files, malformed JSON
    /// and graphs that reference undefined values.
    pub fn load(path: impl AsRef<Path>, config: Config) -> Result<ModelHandle> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| RuntimeError::ModelLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json(&source, path, config)
    }

    /// Parse a model description already in memory. `path` is only recorded
    /// for diagnostics.
    pub fn from_json(source: &str, path: impl AsRef<Path>, config: Config) -> Result<ModelHandle> {
        let path = path.as_ref().to_path_buf();
        let fail = |reason: String| RuntimeError::ModelLoadFailed {
            path: path.clone(),
            reason,
        };

        let desc: ModelDesc = serde_json::from_str(source).map_err(|e| fail(e.to_string()))?;

        let mut initializers = BTreeMap::new();
        for (name, init) in desc.initializers {
            let shape = Shape::new(init.shape);
            if shape.numel() != init.data.len() {
                return Err(fail(format!(
                    "initializer '{}' has {} values but shape {}",
                    name,
                    init.data.len(),
                    shape
                )));
            }
            initializers.insert(name, Initializer { shape, data: init.data });
        }

        let to_info = |v: ValueDesc| ValueInfo {
            name: v.name,
            dtype: DType::F32,
            shape: v.shape.map(Shape::new),
        };
        let inputs: Vec<ValueInfo> = desc.inputs.into_iter().map(to_info).collect();
        let outputs: Vec<ValueInfo> = desc.outputs.into_iter().map(to_info).collect();

        // Every value must be defined before it is consumed.
        let mut defined: HashSet<&str> = inputs.iter().map(|v| v.name.as_str()).collect();
        defined.extend(initializers.keys().map(String::as_str));
        for node in &desc.nodes {
            if node.inputs.len() != node.op.arity() {
                return Err(fail(format!(
                    "{:?} node '{}' takes {} inputs, got {}",
                    node.op,
                    node.output,
                    node.op.arity(),
                    node.inputs.len()
                )));
            }
            if let Some(missing) = node.inputs.iter().find(|i| !defined.contains(i.as_str())) {
                return Err(fail(format!(
                    "node '{}' consumes undefined value '{}'",
                    node.output, missing
                )));
            }
            defined.insert(node.output.as_str());
        }
        if let Some(missing) = outputs.iter().find(|o| !defined.contains(o.name.as_str())) {
            return Err(fail(format!("output '{}' is never produced", missing.name)));
        }

        info!(
            path = %path.display(),
            opset = desc.opset,
            nodes = desc.nodes.len(),
            "loaded model"
        );

        Ok(ModelHandle {
            path,
            config,
            opset: desc.opset,
            inputs,
            outputs,
            initializers,
            nodes: desc.nodes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn opset(&self) -> u32 {
        self.opset
    }

    pub fn inputs(&self) -> &[ValueInfo] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueInfo] {
        &self.outputs
    }

    pub fn input(&self, name: &str) -> Option<&ValueInfo> {
        self.inputs.iter().find(|v| v.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&ValueInfo> {
        self.outputs.iter().find(|v| v.name == name)
    }

    pub fn initializer(&self, name: &str) -> Option<&Initializer> {
        self.initializers.get(name)
    }

    /// Graph nodes in execution order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

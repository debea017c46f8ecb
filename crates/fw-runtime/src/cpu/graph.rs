use std::collections::HashMap;

use fw_tensor::{DType, Shape, Tensor, TensorError};
use tracing::{trace, warn};

use crate::backend::{Backend, BackendSession};
use crate::error::{Result, RuntimeError};
use crate::kernels::Kernels;
use crate::model::{ModelHandle, Node, Op};

/// Backend that interprets a model's node list with a set of [`Kernels`].
#[derive(Debug, Clone, Default)]
pub struct GraphBackend<K: Kernels> {
    kernels: K,
}

impl<K: Kernels> GraphBackend<K> {
    pub fn new(kernels: K) -> Self {
        GraphBackend { kernels }
    }
}

impl<K: Kernels> Backend for GraphBackend<K> {
    fn name(&self) -> &str {
        self.kernels.name()
    }

    fn open_session<'m>(&self, model: &'m ModelHandle) -> Result<Box<dyn BackendSession + 'm>> {
        Ok(Box::new(GraphSession {
            kernels: self.kernels.clone(),
            model,
            feeds: HashMap::new(),
            values: None,
        }))
    }
}

/// A dense f32 intermediate value.
#[derive(Debug, Clone)]
struct Value {
    shape: Shape,
    data: Vec<f32>,
}

pub struct GraphSession<'m, K: Kernels> {
    kernels: K,
    model: &'m ModelHandle,
    feeds: HashMap<String, Tensor>,
    values: Option<HashMap<String, Value>>,
}

impl<K: Kernels> GraphSession<'_, K> {
    fn fail(&self, reason: impl Into<String>) -> RuntimeError {
        RuntimeError::Execution {
            backend: self.kernels.name().to_string(),
            reason: reason.into(),
        }
    }

    /// Look up a node operand among computed values, then initializers.
    fn operand<'a>(&'a self, values: &'a HashMap<String, Value>, name: &str) -> Result<ValueRef<'a>> {
        if let Some(v) = values.get(name) {
            return Ok(ValueRef {
                shape: &v.shape,
                data: &v.data,
            });
        }
        if let Some(init) = self.model.initializer(name) {
            return Ok(ValueRef {
                shape: &init.shape,
                data: &init.data,
            });
        }
        Err(self.fail(format!("value '{}' is undefined", name)))
    }

    fn eval(&self, node: &Node, values: &HashMap<String, Value>) -> Result<Value> {
        let a = self.operand(values, &node.inputs[0])?;
        match &node.op {
            Op::MatMul => {
                let b = self.operand(values, &node.inputs[1])?;
                if a.shape.ndim() != 2 || b.shape.ndim() != 2 {
                    return Err(self.fail(format!(
                        "MatMul '{}' needs 2-D operands, got {} and {}",
                        node.output, a.shape, b.shape
                    )));
                }
                let (m, k, k2, n) = (a.shape.dim(0), a.shape.dim(1), b.shape.dim(0), b.shape.dim(1));
                if k != k2 {
                    return Err(TensorError::MatmulMismatch { m, k, k2, n }.into());
                }
                let data = self.kernels.matmul(a.data, b.data, m, k, n)?;
                Ok(Value {
                    shape: Shape::new(vec![m, n]),
                    data,
                })
            }
            Op::Add | Op::Mul => {
                let b = self.operand(values, &node.inputs[1])?;
                let shape = Shape::broadcast_shape(a.shape, b.shape)?;
                let lhs = expand(&a, &shape);
                let rhs = expand(&b, &shape);
                let data = if node.op == Op::Add {
                    self.kernels.add(&lhs, &rhs)?
                } else {
                    self.kernels.mul(&lhs, &rhs)?
                };
                Ok(Value { shape, data })
            }
            Op::Relu => Ok(Value {
                shape: a.shape.clone(),
                data: self.kernels.relu(a.data),
            }),
            Op::Softmax => {
                let row_len = a.shape.dims().last().copied().unwrap_or(1);
                let data = if a.data.is_empty() {
                    Vec::new()
                } else {
                    self.kernels.softmax(a.data, row_len)?
                };
                Ok(Value {
                    shape: a.shape.clone(),
                    data,
                })
            }
            Op::Reshape { shape } => {
                let shape = Shape::from_slice(shape);
                if shape.numel() != a.shape.numel() {
                    return Err(TensorError::ShapeMismatch {
                        expected: a.shape.dims().to_vec(),
                        got: shape.dims().to_vec(),
                    }
                    .into());
                }
                Ok(Value {
                    shape,
                    data: a.data.to_vec(),
                })
            }
        }
    }
}

struct ValueRef<'a> {
    shape: &'a Shape,
    data: &'a [f32],
}

/// Materialize `v` at the broadcast shape `out`.
fn expand(v: &ValueRef<'_>, out: &Shape) -> Vec<f32> {
    if v.shape == out {
        return v.data.to_vec();
    }
    (0..out.numel())
        .map(|i| v.data[v.shape.broadcast_index(out, i)])
        .collect()
}

impl<K: Kernels> BackendSession for GraphSession<'_, K> {
    fn feed(&mut self, name: &str, tensor: Tensor) -> Result<()> {
        let info = self
            .model
            .input(name)
            .ok_or_else(|| RuntimeError::UnknownInput(name.to_string()))?;
        if tensor.dtype() != info.dtype {
            return Err(TensorError::DTypeMismatch {
                expected: info.dtype,
                got: tensor.dtype(),
            }
            .into());
        }
        if let Some(declared) = &info.shape {
            if declared != tensor.shape() {
                return Err(TensorError::ShapeMismatch {
                    expected: declared.dims().to_vec(),
                    got: tensor.shape().dims().to_vec(),
                }
                .into());
            }
        }
        self.feeds.insert(name.to_string(), tensor);
        self.values = None;
        Ok(())
    }

    fn forward(&mut self) -> Result<()> {
        let mut values = HashMap::new();
        for info in self.model.inputs() {
            let tensor = self
                .feeds
                .get(&info.name)
                .ok_or_else(|| RuntimeError::MissingInput(info.name.clone()))?;
            values.insert(
                info.name.clone(),
                Value {
                    shape: tensor.shape().clone(),
                    data: tensor.to_f32_vec()?,
                },
            );
        }

        for node in self.model.nodes() {
            let value = self.eval(node, &values)?;
            trace!(backend = self.kernels.name(), node = %node.output, shape = %value.shape, "evaluated");
            values.insert(node.output.clone(), value);
        }

        if values.values().flat_map(|v| &v.data).any(|x| !x.is_finite()) {
            warn!(backend = self.kernels.name(), "forward produced non-finite values");
        }
        self.values = Some(values);
        Ok(())
    }

    fn output(&mut self, name: &str) -> Result<Tensor> {
        if self.model.output(name).is_none() {
            return Err(RuntimeError::UnknownOutput(name.to_string()));
        }
        let values = self
            .values
            .as_ref()
            .ok_or_else(|| RuntimeError::NotExecuted(name.to_string()))?;
        let value = values
            .get(name)
            .ok_or_else(|| self.fail(format!("output '{}' was not computed", name)))?;
        let shape = if value.shape.ndim() == 0 {
            Shape::new(vec![1])
        } else {
            value.shape.clone()
        };
        let tensor = Tensor::from_f32(shape, &value.data, self.model.config().memory_byte_order)?;
        debug_assert_eq!(tensor.dtype(), DType::F32);
        Ok(tensor.with_name(name))
    }

    fn release(&mut self) {
        self.feeds.clear();
        self.values = None;
    }
}

use std::path::{Path, PathBuf};

use fw_tensor::{ByteOrder, DType, Shape, Tensor};
use prost::Message;
use tracing::debug;

use crate::error::{FixtureError, Result};
use crate::proto::{dims_are_packed, TensorProto, DATA_LOCATION_EXTERNAL};

const DATA_SET_PREFIX: &str = "test_data_set_";

/// One golden test case: an input and the output the model must reproduce.
#[derive(Debug, Clone, PartialEq)]
pub struct FixturePair {
    pub input: Tensor,
    pub expected_output: Tensor,
    pub input_name: String,
    pub output_name: String,
}

/// Which `TensorProto` field holds the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadField {
    /// Little-endian bytes in `raw_data`.
    #[default]
    Raw,
    /// The repeated field for the data type (`float_data`, `int32_data`, ...).
    Typed,
}

/// How a record was laid out on disk, beyond the tensor it holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordLayout {
    pub payload: PayloadField,
    /// `dims` written packed, as `onnx.proto3` writers do.
    pub packed_dims: bool,
    pub doc_string: Option<String>,
    pub data_location: Option<i32>,
}

/// A decoded fixture together with its on-disk layout. Encoding a record
/// loaded from a file reproduces that file.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureRecord {
    pub tensor: Tensor,
    pub layout: RecordLayout,
}

/// Reads serialized `TensorProto` fixtures into tensors laid out in a fixed
/// in-memory byte order.
#[derive(Debug, Clone, Copy)]
pub struct FixtureLoader {
    byte_order: ByteOrder,
}

impl FixtureLoader {
    pub fn new(byte_order: ByteOrder) -> Self {
        FixtureLoader { byte_order }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Load one fixture file.
    ///
    /// # Errors
    /// `FixtureNotFound` if `path` does not exist, `MalformedFixture` if the
    /// record does not decode into a well-formed tensor.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Tensor> {
        Ok(self.load_record(path)?.tensor)
    }

    /// Load one fixture file, keeping its layout for [`save_record`](Self::save_record).
    pub fn load_record(&self, path: impl AsRef<Path>) -> Result<FixtureRecord> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| FixtureError::io(path, e))?;
        let record = self.decode_record(&bytes, path)?;
        debug!(
            path = %path.display(),
            dtype = %record.tensor.dtype(),
            shape = %record.tensor.shape(),
            "loaded fixture"
        );
        Ok(record)
    }

    /// Decode a record already in memory. `path` is only used in errors.
    pub fn decode(&self, bytes: &[u8], path: &Path) -> Result<Tensor> {
        Ok(self.decode_record(bytes, path)?.tensor)
    }

    pub fn decode_record(&self, bytes: &[u8], path: &Path) -> Result<FixtureRecord> {
        let mut proto = TensorProto::decode(bytes)
            .map_err(|e| FixtureError::malformed(path, format!("not a TensorProto: {}", e)))?;
        let packed_dims = dims_are_packed(bytes)
            .ok_or_else(|| FixtureError::malformed(path, "truncated protobuf field"))?;

        if proto.data_location == Some(DATA_LOCATION_EXTERNAL) {
            return Err(FixtureError::malformed(path, "payload is stored externally"));
        }
        let type_id = proto.data_type.unwrap_or(0);
        let dtype = DType::from_onnx_type(type_id)
            .ok_or_else(|| FixtureError::malformed(path, format!("unsupported data type {}", type_id)))?;
        let shape = Shape::from_signed(&proto.dims)
            .ok_or_else(|| FixtureError::malformed(path, format!("invalid dims {:?}", proto.dims)))?;
        if shape.ndim() == 0 {
            return Err(FixtureError::malformed(path, "record has no dims"));
        }
        let numel = shape
            .checked_numel()
            .ok_or_else(|| FixtureError::malformed(path, format!("dims {:?} overflow", proto.dims)))?;

        // An empty `raw_data` only carries the payload when no typed field does.
        let raw = proto.raw_data.take();
        let (payload, field) = match raw {
            Some(raw) if !raw.is_empty() || !has_typed_values(&proto) => (raw, PayloadField::Raw),
            _ => (
                typed_payload(&proto, dtype, numel).map_err(|reason| FixtureError::malformed(path, reason))?,
                PayloadField::Typed,
            ),
        };

        // `raw_data` is little-endian by definition.
        let tensor = Tensor::from_bytes(dtype, shape, ByteOrder::LittleEndian, payload)
            .map_err(|e| FixtureError::malformed(path, e.to_string()))?
            .to_byte_order(self.byte_order);
        let tensor = match proto.name {
            Some(name) => tensor.with_name(name),
            None => tensor,
        };
        Ok(FixtureRecord {
            tensor,
            layout: RecordLayout {
                payload: field,
                packed_dims,
                doc_string: proto.doc_string,
                data_location: proto.data_location,
            },
        })
    }

    /// Write `tensor` as a canonical fixture record.
    pub fn save(&self, path: impl AsRef<Path>, tensor: &Tensor) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, encode_fixture(tensor)).map_err(|e| FixtureError::io(path, e))
    }

    /// Write `record` in its own layout.
    pub fn save_record(&self, path: impl AsRef<Path>, record: &FixtureRecord) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, encode_record(record)).map_err(|e| FixtureError::io(path, e))
    }

    /// Load `input_0.pb` / `output_0.pb` from every `test_data_set_<n>`
    /// directory under `dir`, in ascending `<n>`.
    pub fn discover_pairs(
        &self,
        dir: impl AsRef<Path>,
        input_name: &str,
        output_name: &str,
    ) -> Result<Vec<FixturePair>> {
        let dir = dir.as_ref();
        let mut sets: Vec<(u64, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| FixtureError::io(dir, e))? {
            let entry = entry.map_err(|e| FixtureError::io(dir, e))?;
            let index = entry
                .file_name()
                .to_str()
                .and_then(|n| n.strip_prefix(DATA_SET_PREFIX))
                .and_then(|n| n.parse::<u64>().ok());
            if let Some(index) = index {
                if entry.path().is_dir() {
                    sets.push((index, entry.path()));
                }
            }
        }
        sets.sort_by_key(|(index, _)| *index);

        sets.into_iter()
            .map(|(_, set)| -> Result<FixturePair> {
                Ok(FixturePair {
                    input: self.load(set.join("input_0.pb"))?,
                    expected_output: self.load(set.join("output_0.pb"))?,
                    input_name: input_name.to_string(),
                    output_name: output_name.to_string(),
                })
            })
            .collect()
    }
}

/// Encode `tensor` as a `TensorProto` with a little-endian `raw_data`
/// payload, the form ONNX tooling writes.
pub fn encode_fixture(tensor: &Tensor) -> Vec<u8> {
    encode_with_layout(tensor, &RecordLayout::default())
}

/// Encode `record` in its own layout.
pub fn encode_record(record: &FixtureRecord) -> Vec<u8> {
    encode_with_layout(&record.tensor, &record.layout)
}

fn encode_with_layout(tensor: &Tensor, layout: &RecordLayout) -> Vec<u8> {
    let raw = tensor.clone().to_byte_order(ByteOrder::LittleEndian).into_bytes();
    let mut proto = TensorProto {
        dims: tensor.shape().to_signed(),
        data_type: Some(tensor.dtype().to_onnx_type()),
        name: tensor.name().map(str::to_string),
        doc_string: layout.doc_string.clone(),
        data_location: layout.data_location,
        ..Default::default()
    };
    match layout.payload {
        PayloadField::Raw => proto.raw_data = Some(raw),
        PayloadField::Typed => fill_typed(&mut proto, tensor.dtype(), &raw),
    }

    if !layout.packed_dims {
        return proto.encode_to_vec();
    }
    // `dims` is field 1, so writing it first keeps fields in tag order.
    let dims = std::mem::take(&mut proto.dims);
    let mut buf = Vec::with_capacity(proto.encoded_len() + 2 + 10 * dims.len());
    prost::encoding::int64::encode_packed(1, &dims, &mut buf);
    buf.extend(proto.encode_to_vec());
    buf
}

fn has_typed_values(proto: &TensorProto) -> bool {
    !(proto.float_data.is_empty()
        && proto.int32_data.is_empty()
        && proto.int64_data.is_empty()
        && proto.double_data.is_empty())
}

/// Store little-endian element bytes `raw` in the typed field for `dtype`.
fn fill_typed(proto: &mut TensorProto, dtype: DType, raw: &[u8]) {
    let size = dtype.size_in_bytes();
    let chunks = raw.chunks_exact(size);
    match dtype {
        DType::F32 => {
            proto.float_data = chunks
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        }
        DType::F64 => {
            proto.double_data = chunks
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect()
        }
        DType::I64 => {
            proto.int64_data = chunks
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect()
        }
        DType::I32 => {
            proto.int32_data = chunks
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        }
        DType::F16 => {
            proto.int32_data = chunks
                .map(|c| i32::from(u16::from_le_bytes([c[0], c[1]])))
                .collect()
        }
        DType::I8 => proto.int32_data = chunks.map(|c| i32::from(c[0] as i8)).collect(),
        DType::U8 => proto.int32_data = chunks.map(|c| i32::from(c[0])).collect(),
    }
}

/// Build a little-endian payload from the typed repeated fields.
fn typed_payload(
    proto: &TensorProto,
    dtype: DType,
    numel: usize,
) -> std::result::Result<Vec<u8>, String> {
    let (count, bytes): (usize, Vec<u8>) = match dtype {
        DType::F32 => (
            proto.float_data.len(),
            proto.float_data.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        DType::F64 => (
            proto.double_data.len(),
            proto.double_data.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        DType::I64 => (
            proto.int64_data.len(),
            proto.int64_data.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        DType::I32 => (
            proto.int32_data.len(),
            proto.int32_data.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        // Narrow types are widened into int32_data; FLOAT16 stores bit patterns.
        DType::F16 => (
            proto.int32_data.len(),
            proto
                .int32_data
                .iter()
                .flat_map(|&v| (v as u16).to_le_bytes())
                .collect(),
        ),
        DType::I8 | DType::U8 => (
            proto.int32_data.len(),
            proto.int32_data.iter().map(|&v| v as u8).collect(),
        ),
    };
    if count != numel {
        return Err(format!(
            "payload holds {} {} elements but dims need {}",
            count, dtype, numel
        ));
    }
    Ok(bytes)
}

//! The subset of the ONNX `TensorProto` message used by fixture files.
//!
//! `onnx.proto` is proto2: scalar fields carry explicit presence and `dims`
//! is the one repeated field that is not packed. Both are mirrored here.
//! Records written from `onnx.proto3` pack `dims`; see
//! [`dims_are_packed`].

/// `onnx.TensorProto`, restricted to dense numeric tensors.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TensorProto {
    #[prost(int64, repeated, packed = "false", tag = "1")]
    pub dims: Vec<i64>,
    #[prost(int32, optional, tag = "2")]
    pub data_type: Option<i32>,
    #[prost(float, repeated, tag = "4")]
    pub float_data: Vec<f32>,
    #[prost(int32, repeated, tag = "5")]
    pub int32_data: Vec<i32>,
    #[prost(int64, repeated, tag = "7")]
    pub int64_data: Vec<i64>,
    #[prost(string, optional, tag = "8")]
    pub name: Option<String>,
    #[prost(bytes = "vec", optional, tag = "9")]
    pub raw_data: Option<Vec<u8>>,
    #[prost(double, repeated, tag = "10")]
    pub double_data: Vec<f64>,
    #[prost(string, optional, tag = "12")]
    pub doc_string: Option<String>,
    /// `DataLocation`: 0 is DEFAULT (payload in the record), 1 is EXTERNAL.
    #[prost(int32, optional, tag = "14")]
    pub data_location: Option<i32>,
}

pub const DATA_LOCATION_EXTERNAL: i32 = 1;

const DIMS_TAG: u32 = 1;

/// Whether the top-level `dims` field of an encoded record uses the packed
/// (length-delimited) encoding. `None` if the bytes are not well-formed
/// protobuf.
pub fn dims_are_packed(mut buf: &[u8]) -> Option<bool> {
    use prost::bytes::Buf;
    use prost::encoding::{decode_key, decode_varint, WireType};

    let mut packed = false;
    while buf.has_remaining() {
        let (tag, wire_type) = decode_key(&mut buf).ok()?;
        let skip = match wire_type {
            WireType::Varint => {
                decode_varint(&mut buf).ok()?;
                0
            }
            WireType::SixtyFourBit => 8,
            WireType::ThirtyTwoBit => 4,
            WireType::LengthDelimited => {
                if tag == DIMS_TAG {
                    packed = true;
                }
                usize::try_from(decode_varint(&mut buf).ok()?).ok()?
            }
            WireType::StartGroup | WireType::EndGroup => return None,
        };
        if buf.remaining() < skip {
            return None;
        }
        buf.advance(skip);
    }
    Some(packed)
}

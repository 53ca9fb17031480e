//! Serialization boundary between decoded values and stored text.
//!
//! Values are modeled as [`serde_json::Value`]. The default [`JsonCodec`]
//! writes plain JSON, except that binary payloads are stored compactly:
//!
//! | Decoded form | Encoded form |
//! |--------------|--------------|
//! | `{"type":"Buffer","data":[104,105]}` | `{"type":"Buffer","data":"base64:aGk="}` |
//! | `{"type":"Buffer","data":[]}` | `{"type":"Buffer","data":""}` |
//!
//! Decoding also accepts `data` as a plain UTF-8 string. Use [`Buffer`] to
//! move bytes in and out of this representation.
//!
//! Any stored object shaped `{"type":"Buffer","data":"<string>"}` is read
//! back as a buffer, even if it was written as an ordinary object whose
//! `data` field happened to be a string.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EndbError, EndbResult};

const BUFFER_TYPE: &str = "Buffer";
const BASE64_PREFIX: &str = "base64:";

/// Converts decoded values to and from their stored text form.
pub trait Codec: Send + Sync {
    /// Encode a value for storage.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Serialization`] if the value cannot be encoded.
    fn serialize(&self, value: &Value) -> EndbResult<String>;

    /// Decode a stored value.
    ///
    /// # Errors
    ///
    /// Returns [`EndbError::Serialization`] if the text is not a valid encoding.
    fn deserialize(&self, encoded: &str) -> EndbResult<Value>;
}

/// JSON codec with base64 buffer compaction. The default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn serialize(&self, value: &Value) -> EndbResult<String> {
        let mut value = value.clone();
        compact_buffers(&mut value);
        serde_json::to_string(&value).map_err(|e| EndbError::Serialization(e.to_string()))
    }

    fn deserialize(&self, encoded: &str) -> EndbResult<Value> {
        let mut value: Value =
            serde_json::from_str(encoded).map_err(|e| EndbError::Serialization(e.to_string()))?;
        expand_buffers(&mut value)?;
        Ok(value)
    }
}

fn is_buffer_object(map: &serde_json::Map<String, Value>) -> bool {
    map.get("type").and_then(Value::as_str) == Some(BUFFER_TYPE)
}

/// Rewrite `data: [bytes]` buffers into their `base64:` string form.
fn compact_buffers(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if is_buffer_object(map)
                && let Some(Value::Array(items)) = map.get("data")
                && let Some(bytes) = bytes_from_array(items)
            {
                let data = if bytes.is_empty() {
                    String::new()
                } else {
                    format!("{BASE64_PREFIX}{}", STANDARD.encode(&bytes))
                };
                map.insert("data".to_owned(), Value::String(data));
                return;
            }
            map.values_mut().for_each(compact_buffers);
        },
        Value::Array(items) => items.iter_mut().for_each(compact_buffers),
        _ => {},
    }
}

/// Rewrite string-form buffers back into `data: [bytes]`.
fn expand_buffers(value: &mut Value) -> EndbResult<()> {
    match value {
        Value::Object(map) => {
            if is_buffer_object(map)
                && let Some(Value::String(data)) = map.get("data")
            {
                let bytes = decode_buffer_data(data)?;
                map.insert("data".to_owned(), bytes_to_array(&bytes));
                return Ok(());
            }
            for child in map.values_mut() {
                expand_buffers(child)?;
            }
        },
        Value::Array(items) => {
            for child in items {
                expand_buffers(child)?;
            }
        },
        _ => {},
    }
    Ok(())
}

fn decode_buffer_data(data: &str) -> EndbResult<Vec<u8>> {
    match data.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => STANDARD
            .decode(encoded)
            .map_err(|e| EndbError::Serialization(format!("invalid buffer payload: {e}"))),
        None => Ok(data.as_bytes().to_vec()),
    }
}

fn bytes_from_array(items: &[Value]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

fn bytes_to_array(bytes: &[u8]) -> Value {
    Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// Binary payload that survives the [`JsonCodec`] round trip.
///
/// Serializes as `{"type":"Buffer","data":[...]}`; deserializes from that
/// form or from the encoded string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Buffer(pub Vec<u8>);

impl Buffer {
    /// Borrow the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take the raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Buffer> for Value {
    fn from(buffer: Buffer) -> Self {
        let mut map = serde_json::Map::new();
        map.insert("type".to_owned(), Value::String(BUFFER_TYPE.to_owned()));
        map.insert("data".to_owned(), bytes_to_array(&buffer.0));
        Value::Object(map)
    }
}

impl Serialize for Buffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", BUFFER_TYPE)?;
        map.serialize_entry("data", &self.0)?;
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BufferData {
    Bytes(Vec<u8>),
    Text(String),
}

#[derive(Deserialize)]
struct BufferRepr {
    #[serde(rename = "type")]
    kind: String,
    data: BufferData,
}

impl<'de> Deserialize<'de> for Buffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = BufferRepr::deserialize(deserializer)?;
        if repr.kind != BUFFER_TYPE {
            return Err(de::Error::custom(format!(
                "expected type \"{BUFFER_TYPE}\", found \"{}\"",
                repr.kind
            )));
        }
        match repr.data {
            BufferData::Bytes(bytes) => Ok(Self(bytes)),
            BufferData::Text(text) => decode_buffer_data(&text)
                .map(Self)
                .map_err(de::Error::custom),
        }
    }
}

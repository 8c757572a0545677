//! Value Serialization
//!
//! Encodes and decodes values to and from byte blobs for durable storage.
//! Two reference codecs: a portable human-readable one (JSON) and a compact
//! binary one (bincode).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

// == Serializer Trait ==
/// Turns values into byte blobs and back.
///
/// Implementations must satisfy `decode(encode(v)) == v` for every value
/// they claim to support.
pub trait Serializer<V>: Send + Sync {
    /// Encodes the value into a blob.
    fn encode(&self, value: &V) -> Result<Vec<u8>>;

    /// Decodes a value from a blob.
    fn decode(&self, raw: &[u8]) -> Result<V>;
}

// == JSON Serializer ==
/// Serializes values as UTF-8 JSON.
///
/// Portable and human-readable; round-trips primitive composites (numbers,
/// strings, sequences, string-keyed maps). Values JSON cannot represent,
/// such as maps with non-string keys, fail to encode.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl<V> Serializer<V> for JsonSerializer
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::Encode {
            type_name: std::any::type_name::<V>(),
            source: Box::new(e),
        })
    }

    fn decode(&self, raw: &[u8]) -> Result<V> {
        serde_json::from_slice(raw).map_err(|e| CacheError::Decode {
            type_name: std::any::type_name::<V>(),
            source: Box::new(e),
        })
    }
}

// == Bincode Serializer ==
/// Serializes values with bincode.
///
/// Round-trips anything serde can represent, including types the JSON codec
/// rejects, at the cost of blobs only meaningful to a compatible reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeSerializer;

impl<V> Serializer<V> for BincodeSerializer
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| CacheError::Encode {
            type_name: std::any::type_name::<V>(),
            source: e,
        })
    }

    fn decode(&self, raw: &[u8]) -> Result<V> {
        bincode::deserialize(raw).map_err(|e| CacheError::Decode {
            type_name: std::any::type_name::<V>(),
            source: e,
        })
    }
}

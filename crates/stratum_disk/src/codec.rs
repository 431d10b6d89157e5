// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Conversion between cached values and the bytes stored on disk.

#[cfg(feature = "json")]
use std::marker::PhantomData;

/// Converts values to bytes and back.
///
/// A payload that fails to decode is treated as a miss: the entry is removed and the lookup
/// fails. An encoding failure aborts the write and is logged.
///
/// # Examples
///
/// ```
/// use stratum_disk::{Codec, CodecError};
///
/// struct Counter;
///
/// impl Codec<u64> for Counter {
///     fn encode(&self, value: &u64) -> Result<Vec<u8>, CodecError> {
///         Ok(value.to_le_bytes().to_vec())
///     }
///
///     fn decode(&self, bytes: &[u8]) -> Result<u64, CodecError> {
///         let bytes: [u8; 8] = bytes.try_into().map_err(CodecError::caused_by)?;
///         Ok(u64::from_le_bytes(bytes))
///     }
/// }
/// ```
pub trait Codec<V>: Send + Sync {
    /// Serializes `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as bytes.
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError>;

    /// Deserializes a value previously produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a valid payload.
    fn decode(&self, bytes: &[u8]) -> Result<V, CodecError>;
}

/// A value could not be encoded or decoded.
#[ohno::error]
#[display("codec failure")]
pub struct CodecError;

/// Stores byte vectors as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec<Vec<u8>> for RawCodec {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

/// Stores strings as UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl Codec<String> for Utf8Codec {
    fn encode(&self, value: &String) -> Result<Vec<u8>, CodecError> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        String::from_utf8(bytes.to_vec()).map_err(CodecError::caused_by)
    }
}

/// Stores any serde-compatible value as JSON.
///
/// # Examples
///
/// ```
/// use stratum_disk::{Codec, JsonCodec};
///
/// let codec = JsonCodec::<Vec<u32>>::new();
/// let bytes = codec.encode(&vec![1, 2, 3]).unwrap();
/// assert_eq!(bytes, b"[1,2,3]");
/// ```
#[cfg(feature = "json")]
#[cfg_attr(docsrs, doc(cfg(feature = "json")))]
pub struct JsonCodec<V>(PhantomData<fn() -> V>);

#[cfg(feature = "json")]
impl<V> JsonCodec<V> {
    /// Creates a JSON codec.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

#[cfg(feature = "json")]
impl<V> Default for JsonCodec<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "json")]
impl<V> Clone for JsonCodec<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[cfg(feature = "json")]
impl<V> std::fmt::Debug for JsonCodec<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonCodec")
    }
}

#[cfg(feature = "json")]
impl<V> Codec<V> for JsonCodec<V>
where
    V: serde::Serialize + serde::de::DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::caused_by)
    }

    fn decode(&self, bytes: &[u8]) -> Result<V, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::caused_by)
    }
}

//! Serialization of requests for transport or storage.
//!
//! Courier itself never serializes requests. Integration events usually
//! leave the process, so a [`Marshaller`] gives applications one seam for
//! the wire format.

use crate::error::MarshalError;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Converts values to and from bytes.
pub trait Marshaller: Send + Sync {
    /// Serializes `value`.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::Serialization`] when the value cannot be encoded.
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, MarshalError>;

    /// Deserializes a value of type `T` from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::Deserialization`] when the bytes do not
    /// decode as a `T`.
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, MarshalError>;
}

/// JSON wire format. Handles every request, metadata included.
///
/// # Examples
///
/// ```
/// use courier_core::marshaller::{JsonMarshaller, Marshaller};
/// use courier_core::metadata::Metadata;
///
/// let mut metadata = Metadata::new();
/// metadata.insert("tenant", "acme").unwrap();
///
/// let bytes = JsonMarshaller.serialize(&metadata).unwrap();
/// let decoded: Metadata = JsonMarshaller.deserialize(&bytes).unwrap();
/// assert_eq!(decoded, metadata);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonMarshaller;

impl Marshaller for JsonMarshaller {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, MarshalError> {
        serde_json::to_vec(value).map_err(|e| MarshalError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, MarshalError> {
        serde_json::from_slice(bytes).map_err(|e| MarshalError::Deserialization(e.to_string()))
    }
}

/// Compact binary wire format.
///
/// Bincode is not self-describing, so it cannot decode
/// [`Metadata`](crate::metadata::Metadata) values. Use it for payloads with
/// a fixed shape and [`JsonMarshaller`] for whole requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeMarshaller;

impl Marshaller for BincodeMarshaller {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, MarshalError> {
        bincode::serialize(value).map_err(|e| MarshalError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, MarshalError> {
        bincode::deserialize(bytes).map_err(|e| MarshalError::Deserialization(e.to_string()))
    }
}

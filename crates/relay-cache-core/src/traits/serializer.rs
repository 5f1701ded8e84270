//! Pluggable serialization trait

use crate::CacheError;
use serde::{de::DeserializeOwned, Serialize};

/// Trait for pluggable serialization formats
///
/// The cache service is value-agnostic: it serializes typed values to
/// bytes before anything else touches them. Implement this trait to add
/// a custom format; JSON is the built-in default.
pub trait Serializer: Send + Sync + Clone + 'static {
    /// Name of the serializer (for debugging/logging)
    fn name(&self) -> &str;

    /// Serialize a value to bytes
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError>;

    /// Deserialize bytes to a value
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError>;
}

/// JSON serializer (default)
///
/// Human-readable, widely compatible, good for debugging.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CacheError> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip() {
        let serializer = JsonSerializer;
        let value = vec![1, 2, 3, 4, 5];

        let bytes = serializer.serialize(&value).unwrap();
        let decoded: Vec<i32> = serializer.deserialize(&bytes).unwrap();

        assert_eq!(value, decoded);
    }

    #[test]
    fn test_json_struct() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct TestStruct {
            name: String,
            value: i32,
        }

        let serializer = JsonSerializer;
        let value = TestStruct {
            name: "test".to_string(),
            value: 42,
        };

        let bytes = serializer.serialize(&value).unwrap();
        let decoded: TestStruct = serializer.deserialize(&bytes).unwrap();

        assert_eq!(value, decoded);
    }

    #[test]
    fn test_json_corrupt_input_fails_cleanly() {
        let serializer = JsonSerializer;
        let result: Result<Vec<i32>, _> = serializer.deserialize(b"\xff\xfe not json");
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }
}

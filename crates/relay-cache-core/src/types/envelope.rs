//! Serialized envelope wrapping one cached value

use crate::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Advisory eviction priority
///
/// Neither shipped backend enforces priorities; the value is persisted
/// so backends that do LRU/priority eviction can honor it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// The on-wire representation of one cached value
///
/// An envelope is what actually lands in the backend: the serialized
/// (and possibly compressed) payload plus the metadata needed to read
/// it back. Envelopes are replaced wholesale on overwrite, never
/// partially updated.
///
/// The encoding is plain JSON of this struct. Unknown fields are
/// ignored and missing optional fields default, so foreign or older
/// payloads either decode or fail cleanly in `from_bytes` rather than
/// crashing the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Serialized bytes of the value, optionally compressed
    pub payload: Vec<u8>,
    /// True when the payload was compressed before storage
    pub is_compressed: bool,
    /// Advisory eviction priority
    #[serde(default)]
    pub priority: Priority,
    /// Group labels for bulk invalidation
    #[serde(default)]
    pub tags: Vec<String>,
    /// When the envelope was created
    pub created_at: SystemTime,
}

impl Envelope {
    /// Create a new envelope around a payload
    pub fn new(payload: Vec<u8>, is_compressed: bool, tags: Vec<String>, priority: Priority) -> Self {
        Self {
            payload,
            is_compressed,
            priority,
            tags,
            created_at: SystemTime::now(),
        }
    }

    /// Encode the envelope into its wire format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Decode an envelope from its wire format
    ///
    /// Corrupted or foreign bytes fail with a `Deserialization` error;
    /// callers downgrade that to a cache miss.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }

    /// Age of the envelope (diagnostics)
    pub fn age(&self) -> Duration {
        self.created_at.elapsed().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let envelope = Envelope::new(
            b"payload".to_vec(),
            true,
            vec!["users".to_string()],
            Priority::High,
        );

        let bytes = envelope.to_bytes().unwrap();
        let decoded = Envelope::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.payload, b"payload");
        assert!(decoded.is_compressed);
        assert_eq!(decoded.priority, Priority::High);
        assert_eq!(decoded.tags, vec!["users".to_string()]);
    }

    #[test]
    fn test_corrupt_bytes_fail_cleanly() {
        let result = Envelope::from_bytes(b"\x00\x01garbage");
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        // Older writers may omit priority and tags
        let json = br#"{"payload":[1,2,3],"is_compressed":false,"created_at":{"secs_since_epoch":0,"nanos_since_epoch":0}}"#;
        let decoded = Envelope::from_bytes(json).unwrap();
        assert_eq!(decoded.priority, Priority::Normal);
        assert!(decoded.tags.is_empty());
    }

    #[test]
    fn test_default_priority() {
        let envelope = Envelope::new(Vec::new(), false, Vec::new(), Priority::default());
        assert_eq!(envelope.priority, Priority::Normal);
    }
}

//! Error types for cache operations

use thiserror::Error;

/// Main error type for all cache operations
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Key failed validation (empty or malformed)
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Compression failed
    #[error("compression error: {0}")]
    Compression(String),

    /// Decompression failed
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Backend connection failed (backend unavailable)
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend operation failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Operation the backend cannot implement (capability gap)
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        /// Name of the backend reporting the gap
        backend: String,
        /// The unsupported operation
        operation: String,
    },
}

impl CacheError {
    /// Whether this error is a declared capability gap rather than a failure
    pub fn is_unsupported(&self) -> bool {
        matches!(self, CacheError::Unsupported { .. })
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

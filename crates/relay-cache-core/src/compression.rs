//! Compression support for cached payloads
//!
//! Provides zstd compression to keep large serialized values cheap to
//! store and ship over the wire. The size threshold that decides whether
//! a payload gets compressed lives in [`crate::CacheConfig`]; the types
//! here only encode and decode.

use crate::CacheError;

/// Compression level (1-22, higher = better compression but slower)
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Trait for compression implementations
pub trait Compressor: Send + Sync + Clone + 'static {
    /// Name of the compressor
    fn name(&self) -> &str;

    /// Compress data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError>;

    /// Decompress data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError>;
}

/// No-op compressor, useful for tests and debugging
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn name(&self) -> &str {
        "none"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        Ok(data.to_vec())
    }
}

/// Zstd compressor
#[derive(Debug, Clone)]
pub struct ZstdCompressor {
    level: i32,
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl ZstdCompressor {
    /// Create a new zstd compressor with the given compression level (1-22)
    pub fn new(level: i32) -> Self {
        Self {
            level: level.clamp(1, 22),
        }
    }

    /// Get the compression level
    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Compressor for ZstdCompressor {
    fn name(&self) -> &str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        zstd::encode_all(data, self.level).map_err(|e| CacheError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheError> {
        zstd::decode_all(data).map_err(|e| CacheError::Decompression(e.to_string()))
    }
}

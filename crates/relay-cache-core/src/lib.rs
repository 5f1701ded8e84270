//! relay-cache-core: Core traits and types for the relay-cache library
//!
//! This crate provides the foundational types and traits used throughout
//! the relay-cache ecosystem: the backend contract, the serialized
//! envelope format, compression, configuration, and metrics.

mod compression;
mod error;
mod traits;
mod types;

pub use compression::{Compressor, NoopCompressor, ZstdCompressor, DEFAULT_COMPRESSION_LEVEL};
pub use error::{CacheError, Result};
pub use traits::*;
pub use types::*;

//! Core traits for cache operations

mod backend;
mod serializer;

pub use backend::CacheBackend;
pub use serializer::{JsonSerializer, Serializer};

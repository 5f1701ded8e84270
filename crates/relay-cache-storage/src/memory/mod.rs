//! In-process memory backend

mod backend;
mod pattern;

pub use backend::{MemoryBackend, MemoryConfig};
pub use pattern::glob_match;

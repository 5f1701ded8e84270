//! relay-cache: backend-agnostic cache service layer
//!
//! # Features
//!
//! - **Typed get/set** over pluggable storage backends (memory, Redis)
//! - **Tag-based group invalidation** and glob pattern invalidation
//! - **Size-aware zstd compression** with a configurable threshold
//! - **Cache-aside** (`get_or_create`) with per-key stampede protection
//! - **Warmup orchestration** and per-service metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use relay_cache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let backend = MemoryBackend::with_defaults();
//!     let cache = CacheService::new(backend);
//!
//!     cache
//!         .set("user:42", &"Alice", EntryOpts::new().expires_secs(60).tag("users"))
//!         .await?;
//!
//!     if let Some(name) = cache.get::<String>("user:42").await? {
//!         println!("Got: {}", name);
//!     }
//!
//!     cache.remove_by_tag("users").await?;
//!     Ok(())
//! }
//! ```

mod service;

// Re-export core
pub use relay_cache_core::*;

// Re-export storage
#[cfg(feature = "memory")]
pub use relay_cache_storage::{MemoryBackend, MemoryConfig};

#[cfg(feature = "redis")]
pub use relay_cache_storage::{RedisBackend, RedisConfig};

// Export the service layer
pub use service::{CacheService, TagIndex, WarmupOutcome, WarmupReport, WarmupStrategy};

// Warmup cancellation
pub use tokio_util::sync::CancellationToken;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CacheConfig, CacheError, CacheService, CancellationToken, EntryOpts, EntryOptions,
        JsonSerializer, Priority, Result, Serializer, WarmupReport, WarmupStrategy,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryBackend, MemoryConfig};

    #[cfg(feature = "redis")]
    pub use crate::{RedisBackend, RedisConfig};
}

#[cfg(test)]
mod tests;

//! Core types for cache operations

mod config;
mod envelope;
mod metrics;
mod options;

pub use config::CacheConfig;
pub use envelope::{Envelope, Priority};
pub use metrics::{CacheMetrics, MetricsCollector};
pub use options::{EntryOptions, EntryOpts};

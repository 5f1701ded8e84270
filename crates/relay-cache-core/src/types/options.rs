//! Per-entry options and builder

use crate::Priority;
use std::time::Duration;

/// Options applied to a single cache entry
#[derive(Debug, Clone, Default)]
pub struct EntryOptions {
    /// Time-to-live; falls back to the service default when `None`
    pub expiration: Option<Duration>,
    /// Tags for bulk invalidation
    pub tags: Vec<String>,
    /// Advisory eviction priority
    pub priority: Priority,
    /// Compress regardless of the configured size threshold
    pub force_compression: bool,
}

/// Builder for `EntryOptions` with fluent API
#[derive(Debug, Clone, Default)]
pub struct EntryOpts(EntryOptions);

impl EntryOpts {
    /// Create new options builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set expiration
    pub fn expires(mut self, duration: Duration) -> Self {
        self.0.expiration = Some(duration);
        self
    }

    /// Set expiration in seconds
    pub fn expires_secs(self, seconds: u64) -> Self {
        self.expires(Duration::from_secs(seconds))
    }

    /// Add multiple tags
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add a single tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.0.tags.push(tag.into());
        self
    }

    /// Set the eviction priority
    pub fn priority(mut self, priority: Priority) -> Self {
        self.0.priority = priority;
        self
    }

    /// Force compression regardless of payload size
    pub fn compress(mut self) -> Self {
        self.0.force_compression = true;
        self
    }

    /// Build the options
    pub fn build(self) -> EntryOptions {
        self.0
    }
}

impl From<EntryOpts> for EntryOptions {
    fn from(opts: EntryOpts) -> Self {
        opts.0
    }
}

impl From<Duration> for EntryOptions {
    fn from(expiration: Duration) -> Self {
        EntryOptions {
            expiration: Some(expiration),
            ..Default::default()
        }
    }
}

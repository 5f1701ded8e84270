//! Cache warmup orchestration
//!
//! A warmup strategy is a unit of pre-population logic. It receives the
//! cache service it will populate as a parameter (no captured handle,
//! no ownership cycle) and writes through the normal `set`/
//! `get_or_create` path.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use relay_cache_core::{CacheBackend, CacheError, Result, Serializer};

use super::CacheService;

/// A unit of cache pre-population logic
#[async_trait]
pub trait WarmupStrategy<B, S = relay_cache_core::JsonSerializer>: Send + Sync
where
    B: CacheBackend,
    S: Serializer,
{
    /// Diagnostic identifier used in logs and reports
    fn name(&self) -> &str;

    /// Populate the cache; cancellation should be honored between
    /// expensive steps
    async fn execute(
        &self,
        cache: &CacheService<B, S>,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Outcome of one strategy within a warmup run
#[derive(Debug, Clone)]
pub enum WarmupOutcome {
    /// Strategy ran to completion
    Completed,
    /// Strategy failed; siblings still ran
    Failed(CacheError),
    /// Run was cancelled before this strategy started
    Skipped,
}

/// Result of a whole warmup run
#[derive(Debug, Clone, Default)]
pub struct WarmupReport {
    /// Per-strategy outcomes in execution order
    pub outcomes: Vec<(String, WarmupOutcome)>,
}

impl WarmupReport {
    /// Number of strategies that completed
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, WarmupOutcome::Completed))
            .count()
    }

    /// Number of strategies that failed
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, WarmupOutcome::Failed(_)))
            .count()
    }

    /// Number of strategies skipped due to cancellation
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, WarmupOutcome::Skipped))
            .count()
    }
}

impl<B, S> CacheService<B, S>
where
    B: CacheBackend,
    S: Serializer,
{
    /// Run warmup strategies against this service, in order
    ///
    /// Each strategy receives this same service instance, so its writes
    /// land in the real cache. A failing strategy is logged and does
    /// not abort its siblings; cancellation stops the run before the
    /// next strategy starts and marks the rest as skipped.
    pub async fn warmup(
        &self,
        strategies: &[Box<dyn WarmupStrategy<B, S>>],
        cancel: &CancellationToken,
    ) -> WarmupReport {
        let mut report = WarmupReport::default();

        for strategy in strategies {
            if cancel.is_cancelled() {
                warn!(strategy = strategy.name(), "warmup cancelled, skipping");
                report
                    .outcomes
                    .push((strategy.name().to_string(), WarmupOutcome::Skipped));
                continue;
            }

            debug!(strategy = strategy.name(), "running warmup strategy");
            match strategy.execute(self, cancel).await {
                Ok(()) => {
                    report
                        .outcomes
                        .push((strategy.name().to_string(), WarmupOutcome::Completed));
                }
                Err(err) => {
                    warn!(
                        strategy = strategy.name(),
                        error = %err,
                        "warmup strategy failed"
                    );
                    report
                        .outcomes
                        .push((strategy.name().to_string(), WarmupOutcome::Failed(err)));
                }
            }
        }

        report
    }
}

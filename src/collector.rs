// Concurrent collection across all enabled sources for one tick.
// Each source runs in its own task with its own retry budget; a failing source contributes
// nothing and never affects the others.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::metrics::CollectorMetrics;
use crate::models::Snapshot;
use crate::retry::{RetryError, RetryPolicy, retry};
use crate::sources::SourceAdapter;

pub struct Collector {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    policy: RetryPolicy,
    metrics: Arc<dyn CollectorMetrics>,
}

impl Collector {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        policy: RetryPolicy,
        metrics: Arc<dyn CollectorMetrics>,
    ) -> Self {
        Self {
            adapters,
            policy,
            metrics,
        }
    }

    /// Fetches every source concurrently and merges whatever succeeded. Always returns;
    /// failed, timed-out and cancelled sources are simply absent from the result.
    pub async fn collect(
        &self,
        collected_at: DateTime<Utc>,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Vec<Snapshot> {
        let mut tasks = JoinSet::new();
        let mut task_sources = HashMap::new();
        for adapter in &self.adapters {
            let adapter = adapter.clone();
            let policy = self.policy.clone();
            let metrics = self.metrics.clone();
            let cancel = cancel.clone();
            let span = tracing::debug_span!("collector", source = %adapter.source());
            let source = adapter.source();
            let handle = tasks.spawn(
                async move {
                    collect_source(adapter, policy, metrics, collected_at, deadline, cancel).await
                }
                .instrument(span),
            );
            task_sources.insert(handle.id(), source);
        }

        let mut merged = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(mut snapshots) => merged.append(&mut snapshots),
                Err(e) => {
                    let source = task_sources.get(&e.id()).copied();
                    if let Some(source) = source {
                        self.metrics.record_collection_error(source);
                    }
                    tracing::warn!(
                        error = %e,
                        source = ?source,
                        operation = "collect_source",
                        "source task failed"
                    );
                }
            }
        }
        merged
    }
}

async fn collect_source(
    adapter: Arc<dyn SourceAdapter>,
    policy: RetryPolicy,
    metrics: Arc<dyn CollectorMetrics>,
    collected_at: DateTime<Utc>,
    deadline: Instant,
    cancel: CancellationToken,
) -> Vec<Snapshot> {
    let source = adapter.source();
    let result = retry(&policy, deadline, Some(&cancel), |attempt| {
        let adapter = adapter.clone();
        async move {
            let r = adapter.fetch(collected_at).await;
            if let Err(e) = &r {
                tracing::warn!(
                    error = %e,
                    source = %source,
                    attempt,
                    operation = "fetch",
                    "source fetch failed"
                );
            }
            r
        }
    })
    .await;

    match result {
        Ok(snapshots) => {
            metrics.record_servers_collected(source, snapshots.len());
            tracing::debug!(
                source = %source,
                servers_count = snapshots.len(),
                "source collected"
            );
            snapshots
        }
        Err(RetryError::Cancelled { attempts }) => {
            tracing::debug!(source = %source, attempts, "collection cancelled");
            Vec::new()
        }
        Err(e) => {
            metrics.record_collection_error(source);
            tracing::warn!(
                error = %e,
                source = %source,
                attempts = e.attempts(),
                operation = "collect_source",
                "source unavailable this tick"
            );
            Vec::new()
        }
    }
}

// Persistence gateway: one bulk write per tick with bounded retry.

use std::sync::Arc;
use tokio::time::Instant;

use crate::metrics::CollectorMetrics;
use crate::models::Snapshot;
use crate::retry::{RetryPolicy, retry};
use crate::server_repo::SnapshotWriter;

pub struct PersistenceGateway {
    writer: Arc<dyn SnapshotWriter>,
    policy: RetryPolicy,
    metrics: Arc<dyn CollectorMetrics>,
}

impl PersistenceGateway {
    pub fn new(
        writer: Arc<dyn SnapshotWriter>,
        policy: RetryPolicy,
        metrics: Arc<dyn CollectorMetrics>,
    ) -> Self {
        Self {
            writer,
            policy,
            metrics,
        }
    }

    /// Writes the batch atomically. An empty batch is a no-op and never reaches the store.
    /// Shutdown does not interrupt a write in progress; only `deadline` bounds it.
    pub async fn insert(&self, snapshots: &[Snapshot], deadline: Instant) -> anyhow::Result<()> {
        if snapshots.is_empty() {
            tracing::debug!(operation = "insert_snapshots", "nothing to persist");
            return Ok(());
        }

        let result = retry(&self.policy, deadline, None, |attempt| {
            let writer = self.writer.clone();
            async move {
                let r = writer.insert_snapshots(snapshots).await;
                if let Err(e) = &r {
                    tracing::warn!(
                        error = %e,
                        attempt,
                        operation = "insert_snapshots",
                        "bulk insert failed"
                    );
                }
                r
            }
        })
        .await;

        match result {
            Ok(()) => {
                self.metrics.record_snapshots_saved(snapshots.len());
                tracing::debug!(
                    operation = "insert_snapshots",
                    snapshots_count = snapshots.len(),
                    "Snapshots saved"
                );
                Ok(())
            }
            Err(e) => {
                self.metrics.record_insert_error();
                Err(anyhow::anyhow!(
                    "insert of {} snapshots failed: {}",
                    snapshots.len(),
                    e
                ))
            }
        }
    }
}

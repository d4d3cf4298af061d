// Collector metrics. Components receive an `Arc<dyn CollectorMetrics>` at construction;
// `CollectorStats` registers its series in the Prometheus registry served on admin /metrics.

use prometheus::{IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry};
use serde::Serialize;

use crate::models::Source;

const NAMESPACE: &str = "gdatum";
const SUBSYSTEM: &str = "servers_stats_collector";
const SOURCE_LABEL: &str = "source";

pub trait CollectorMetrics: Send + Sync {
    /// Gauge: servers returned by the latest successful fetch of `source`.
    fn record_servers_collected(&self, source: Source, count: usize);
    /// Counter: fetches of `source` that exhausted their retries.
    fn record_collection_error(&self, source: Source);
    /// Counter: batches that could not be written after all retries.
    fn record_insert_error(&self);
    /// Counter: snapshots written to the store.
    fn record_snapshots_saved(&self, count: usize);
    /// Counter: finished ticks, successful or not.
    fn record_tick(&self);
}

pub struct CollectorStats {
    servers_collected: IntGaugeVec,
    collection_errors_total: IntCounterVec,
    insert_errors_total: IntCounter,
    snapshots_saved_total: IntCounter,
    ticks_total: IntCounter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub source: Source,
    pub servers_collected: u64,
    pub collection_errors_total: u64,
}

/// Point-in-time copy of the collector series, used by the periodic stats log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorStatsSnapshot {
    pub sources: Vec<SourceStats>,
    pub insert_errors_total: u64,
    pub snapshots_saved_total: u64,
    pub ticks_total: u64,
}

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help)
        .namespace(NAMESPACE)
        .subsystem(SUBSYSTEM)
}

impl CollectorStats {
    /// Creates the collector series and registers them in `registry`.
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let servers_collected = IntGaugeVec::new(
            opts(
                "servers_collected",
                "Number of servers collected from each source directory",
            ),
            &[SOURCE_LABEL],
        )?;
        let collection_errors_total = IntCounterVec::new(
            opts(
                "collection_errors_total",
                "Total number of server collection errors by source",
            ),
            &[SOURCE_LABEL],
        )?;
        let insert_errors_total = IntCounter::with_opts(opts(
            "insert_errors_total",
            "Total number of errors when inserting server data to the store",
        ))?;
        let snapshots_saved_total = IntCounter::with_opts(opts(
            "snapshots_saved_total",
            "Total number of server snapshots written to the store",
        ))?;
        let ticks_total = IntCounter::with_opts(opts(
            "ticks_total",
            "Total number of finished collection ticks",
        ))?;

        registry.register(Box::new(servers_collected.clone()))?;
        registry.register(Box::new(collection_errors_total.clone()))?;
        registry.register(Box::new(insert_errors_total.clone()))?;
        registry.register(Box::new(snapshots_saved_total.clone()))?;
        registry.register(Box::new(ticks_total.clone()))?;

        // Every source is exported from the start, at zero.
        for source in Source::ALL {
            servers_collected.with_label_values(&[source.as_str()]);
            collection_errors_total.with_label_values(&[source.as_str()]);
        }

        Ok(Self {
            servers_collected,
            collection_errors_total,
            insert_errors_total,
            snapshots_saved_total,
            ticks_total,
        })
    }

    pub fn snapshot(&self) -> CollectorStatsSnapshot {
        CollectorStatsSnapshot {
            sources: Source::ALL
                .into_iter()
                .map(|source| SourceStats {
                    source,
                    servers_collected: self
                        .servers_collected
                        .with_label_values(&[source.as_str()])
                        .get()
                        .max(0) as u64,
                    collection_errors_total: self
                        .collection_errors_total
                        .with_label_values(&[source.as_str()])
                        .get(),
                })
                .collect(),
            insert_errors_total: self.insert_errors_total.get(),
            snapshots_saved_total: self.snapshots_saved_total.get(),
            ticks_total: self.ticks_total.get(),
        }
    }
}

impl CollectorMetrics for CollectorStats {
    fn record_servers_collected(&self, source: Source, count: usize) {
        self.servers_collected
            .with_label_values(&[source.as_str()])
            .set(count as i64);
    }

    fn record_collection_error(&self, source: Source) {
        self.collection_errors_total
            .with_label_values(&[source.as_str()])
            .inc();
    }

    fn record_insert_error(&self) {
        self.insert_errors_total.inc();
    }

    fn record_snapshots_saved(&self, count: usize) {
        self.snapshots_saved_total.inc_by(count as u64);
    }

    fn record_tick(&self) {
        self.ticks_total.inc();
    }
}

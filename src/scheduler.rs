// Wall-clock aligned scheduler: runs collect-then-persist once per interval, on interval
// boundaries (top of the hour by default). Tick errors are logged and never stop the loop;
// only cancellation does, after the in-flight tick has drained.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::collector::Collector;
use crate::metrics::{CollectorMetrics, CollectorStats};
use crate::persistence::PersistenceGateway;

/// Truncates `t` down to a multiple of `interval` since the Unix epoch.
pub fn truncate_to_interval(t: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let step = interval.as_millis() as i64;
    if step <= 0 {
        return t;
    }
    let ms = t.timestamp_millis();
    let floored = ms - ms.rem_euclid(step);
    DateTime::from_timestamp_millis(floored).unwrap_or(t)
}

/// The next boundary strictly after `now`, and how long until it.
pub fn next_tick(now: DateTime<Utc>, interval: Duration) -> (DateTime<Utc>, Duration) {
    let step = TimeDelta::from_std(interval).unwrap_or(TimeDelta::hours(1));
    let boundary = truncate_to_interval(now, interval) + step;
    let delay = (boundary - now).to_std().unwrap_or(Duration::ZERO);
    (boundary, delay)
}

/// Collection may use this share (numerator / denominator) of the time left before the tick
/// deadline. The remainder is kept for the bulk insert.
const COLLECT_SHARE: (u32, u32) = (4, 5);

/// Part of a tick budget available to the collection phase.
pub fn collect_budget(tick_budget: Duration) -> Duration {
    let (num, den) = COLLECT_SHARE;
    tick_budget * num / den
}

/// Deadline for the collection phase of a tick that must finish by `deadline`.
pub fn collect_deadline(now: Instant, deadline: Instant) -> Instant {
    now + collect_budget(deadline.saturating_duration_since(now))
}

/// One tick's work: collect, then persist. Shared by the scheduler loop and tests.
pub struct Pipeline {
    pub collector: Collector,
    pub gateway: PersistenceGateway,
    pub metrics: Arc<dyn CollectorMetrics>,
}

impl Pipeline {
    /// Returns the number of snapshots persisted.
    pub async fn run_tick(
        &self,
        collected_at: DateTime<Utc>,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> anyhow::Result<usize> {
        let collect_by = collect_deadline(Instant::now(), deadline);
        let snapshots = self.collector.collect(collected_at, collect_by, cancel).await;
        let count = snapshots.len();
        let result = self.gateway.insert(&snapshots, deadline).await;
        self.metrics.record_tick();
        result.map(|()| count)
    }
}

pub struct SchedulerDeps {
    pub pipeline: Arc<Pipeline>,
    pub stats: Arc<CollectorStats>,
    pub cancel: CancellationToken,
}

pub struct SchedulerConfig {
    pub interval: Duration,
    /// Upper bound on one whole tick (collect plus persist).
    pub tick_timeout: Duration,
    /// How often to log collector stats (real seconds).
    pub stats_log_interval: Duration,
}

pub fn spawn(deps: SchedulerDeps, config: SchedulerConfig) -> tokio::task::JoinHandle<()> {
    let span = tracing::debug_span!("scheduler", interval_secs = config.interval.as_secs());
    tokio::spawn(run(deps, config).instrument(span))
}

async fn run(deps: SchedulerDeps, config: SchedulerConfig) {
    let SchedulerDeps {
        pipeline,
        stats,
        cancel,
    } = deps;
    let SchedulerConfig {
        interval: tick_interval,
        tick_timeout,
        stats_log_interval,
    } = config;

    let mut stats_log_tick = interval(stats_log_interval);
    stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval completes immediately.
    stats_log_tick.tick().await;

    let step = TimeDelta::from_std(tick_interval).unwrap_or(TimeDelta::hours(1));
    let mut last_boundary: Option<DateTime<Utc>> = None;

    loop {
        let now = Utc::now();
        let (mut boundary, _) = next_tick(now, tick_interval);
        // A tick that overran its interval must not fire the same boundary twice.
        if let Some(last) = last_boundary
            && boundary <= last
        {
            boundary = last + step;
        }
        let delay = (boundary - now).to_std().unwrap_or(Duration::ZERO);
        tracing::debug!(next_tick = %boundary, delay_ms = delay.as_millis() as u64, "tick armed");
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Scheduler shutting down");
                    return;
                }
                _ = stats_log_tick.tick() => {
                    let s = stats.snapshot();
                    tracing::info!(
                        ticks_total = s.ticks_total,
                        snapshots_saved_total = s.snapshots_saved_total,
                        insert_errors_total = s.insert_errors_total,
                        "app stats"
                    );
                }
                _ = &mut sleep => break,
            }
        }

        last_boundary = Some(boundary);
        let deadline = Instant::now() + tick_timeout;
        let started = Instant::now();
        let tick_span = tracing::info_span!("tick", collected_at = %boundary);
        let tick = pipeline
            .run_tick(boundary, deadline, &cancel)
            .instrument(tick_span);
        match tokio::time::timeout_at(deadline, tick).await {
            Ok(Ok(saved)) => tracing::info!(
                collected_at = %boundary,
                snapshots_count = saved,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "tick finished"
            ),
            Ok(Err(e)) => tracing::warn!(
                error = %e,
                collected_at = %boundary,
                operation = "tick",
                "tick failed"
            ),
            Err(_) => tracing::warn!(
                collected_at = %boundary,
                timeout_secs = tick_timeout.as_secs(),
                operation = "tick",
                "tick timed out"
            ),
        }
    }
}

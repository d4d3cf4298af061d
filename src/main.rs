use anyhow::Result;
use chrono::TimeDelta;
use gdatum::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let collector_config = &app_config.collector;
    let interval = Duration::from_secs(collector_config.interval_secs);

    let repo = Arc::new(
        server_repo::ServerRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    repo.init().await?;

    let registry = prometheus::Registry::new();
    let stats = Arc::new(metrics::CollectorStats::new(&registry)?);
    let metrics: Arc<dyn metrics::CollectorMetrics> = stats.clone();
    let policy = retry::RetryPolicy::new(
        collector_config.max_attempts,
        Duration::from_millis(collector_config.initial_backoff_ms),
    );

    let client = sources::http_client(Duration::from_secs(collector_config.request_timeout_secs))?;
    let adapters = sources::from_config(&app_config.sources, client);
    tracing::info!(
        sources = ?app_config.sources.enabled,
        interval_secs = collector_config.interval_secs,
        "collector configured"
    );

    let pipeline = Arc::new(scheduler::Pipeline {
        collector: collector::Collector::new(adapters, policy.clone(), metrics.clone()),
        gateway: persistence::PersistenceGateway::new(repo.clone(), policy, metrics.clone()),
        metrics,
    });

    let cancel = CancellationToken::new();
    let scheduler_handle = scheduler::spawn(
        scheduler::SchedulerDeps {
            pipeline,
            stats: stats.clone(),
            cancel: cancel.clone(),
        },
        scheduler::SchedulerConfig {
            interval,
            tick_timeout: Duration::from_secs(collector_config.tick_timeout_secs),
            stats_log_interval: Duration::from_secs(collector_config.stats_log_interval_secs),
        },
    );

    let service = Arc::new(query::QueryService::new(
        repo,
        interval,
        TimeDelta::days(app_config.query.max_statistics_range_days as i64),
    ));
    let public_listener = tokio::net::TcpListener::bind(&app_config.server.public_addr).await?;
    tracing::info!("Listening on http://{}", app_config.server.public_addr);
    let admin_listener = tokio::net::TcpListener::bind(&app_config.server.admin_addr).await?;
    tracing::info!("Admin listening on http://{}", app_config.server.admin_addr);

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            tracing::info!("Received shutdown signal");
            cancel.cancel();
        }
    });

    let public = axum::serve(public_listener, routes::public_app(service))
        .with_graceful_shutdown(cancel.clone().cancelled_owned());
    let admin = axum::serve(admin_listener, routes::admin_app(registry))
        .with_graceful_shutdown(cancel.clone().cancelled_owned());
    let served = tokio::try_join!(public.into_future(), admin.into_future());

    // Either server failing also stops the scheduler.
    cancel.cancel();
    let drain = Duration::from_secs(collector_config.shutdown_timeout_secs);
    match tokio::time::timeout(drain, scheduler_handle).await {
        Ok(Ok(())) => tracing::debug!("Scheduler stopped"),
        Ok(Err(e)) => tracing::warn!(error = %e, "scheduler task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = drain.as_secs(),
            "in-flight tick did not finish before shutdown timeout"
        ),
    }

    served?;
    Ok(())
}

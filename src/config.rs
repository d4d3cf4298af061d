use serde::Deserialize;

use std::time::Duration;

use crate::models::{MAX_STATISTICS_RANGE_DAYS, Source};
use crate::retry::RetryPolicy;
use crate::scheduler::collect_budget;
use crate::sources::{
    ALTV_SERVERS_URL, DEFAULT_MAX_BODY_BYTES, MAJESTIC_SERVERS_URL, RAGEMP_SERVERS_URL,
};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Public query API, e.g. "127.0.0.1:8080".
    pub public_addr: String,
    /// Health, version and collector counters, e.g. "127.0.0.1:8081".
    pub admin_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Ticks land on multiples of this interval (UTC).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Deadline for one collect + insert pass.
    #[serde(default = "default_tick_timeout_secs")]
    pub tick_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Per-request timeout for source directory fetches.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How long shutdown waits for an in-flight tick before giving up on it.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// How often to log collector stats at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_tick_timeout_secs() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_stats_log_interval_secs() -> u64 {
    3600
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            tick_timeout_secs: default_tick_timeout_secs(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_max_statistics_range_days")]
    pub max_statistics_range_days: u32,
}

fn default_max_statistics_range_days() -> u32 {
    MAX_STATISTICS_RANGE_DAYS
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_statistics_range_days: default_max_statistics_range_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_enabled_sources")]
    pub enabled: Vec<Source>,
    #[serde(default = "default_ragemp_url")]
    pub ragemp_url: String,
    #[serde(default = "default_altv_url")]
    pub altv_url: String,
    #[serde(default = "default_majestic_url")]
    pub majestic_url: String,
    /// Directory responses larger than this are rejected as a source failure.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_enabled_sources() -> Vec<Source> {
    Source::ALL.to_vec()
}

fn default_ragemp_url() -> String {
    RAGEMP_SERVERS_URL.into()
}

fn default_altv_url() -> String {
    ALTV_SERVERS_URL.into()
}

fn default_majestic_url() -> String {
    MAJESTIC_SERVERS_URL.into()
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_sources(),
            ragemp_url: default_ragemp_url(),
            altv_url: default_altv_url(),
            majestic_url: default_majestic_url(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl SourcesConfig {
    pub fn url_for(&self, source: Source) -> &str {
        match source {
            Source::Ragemp => &self.ragemp_url,
            Source::Altv => &self.altv_url,
            Source::Majestic => &self.majestic_url,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.server.public_addr.is_empty(),
            "server.public_addr must be non-empty"
        );
        anyhow::ensure!(
            !self.server.admin_addr.is_empty(),
            "server.admin_addr must be non-empty"
        );
        anyhow::ensure!(
            self.server.public_addr != self.server.admin_addr,
            "server.public_addr and server.admin_addr must differ, both are {}",
            self.server.public_addr
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.collector.interval_secs > 0,
            "collector.interval_secs must be > 0, got {}",
            self.collector.interval_secs
        );
        anyhow::ensure!(
            self.collector.tick_timeout_secs > 0,
            "collector.tick_timeout_secs must be > 0, got {}",
            self.collector.tick_timeout_secs
        );
        anyhow::ensure!(
            self.collector.max_attempts > 0,
            "collector.max_attempts must be > 0, got {}",
            self.collector.max_attempts
        );
        anyhow::ensure!(
            self.collector.request_timeout_secs > 0,
            "collector.request_timeout_secs must be > 0, got {}",
            self.collector.request_timeout_secs
        );
        let worst_fetch = RetryPolicy::new(
            self.collector.max_attempts,
            Duration::from_millis(self.collector.initial_backoff_ms),
        )
        .worst_case(Duration::from_secs(self.collector.request_timeout_secs));
        let budget = collect_budget(Duration::from_secs(self.collector.tick_timeout_secs));
        anyhow::ensure!(
            worst_fetch <= budget,
            "collector retries may need {}ms per source, more than the {}ms collection share of collector.tick_timeout_secs",
            worst_fetch.as_millis(),
            budget.as_millis()
        );
        anyhow::ensure!(
            self.collector.stats_log_interval_secs > 0,
            "collector.stats_log_interval_secs must be > 0, got {}",
            self.collector.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.query.max_statistics_range_days > 0,
            "query.max_statistics_range_days must be > 0, got {}",
            self.query.max_statistics_range_days
        );
        anyhow::ensure!(
            self.sources.max_body_bytes > 0,
            "sources.max_body_bytes must be > 0, got {}",
            self.sources.max_body_bytes
        );
        anyhow::ensure!(
            !self.sources.enabled.is_empty(),
            "sources.enabled must list at least one source"
        );
        Ok(())
    }
}

// Source directory adapters: one HTTP GET, one JSON decode, one mapping into Snapshot per source.
// Adapters never retry and never pick their own timestamp; the collector does both.

mod altv;
mod majestic;
mod ragemp;

pub use altv::AltvAdapter;
pub use majestic::MajesticAdapter;
pub use ragemp::RagempAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SourcesConfig;
use crate::models::{Snapshot, Source};

pub const RAGEMP_SERVERS_URL: &str = "https://cdn.rage.mp/master/";
pub const ALTV_SERVERS_URL: &str = "https://api.alt-mp.com/servers";
pub const MAJESTIC_SERVERS_URL: &str = "https://api.majestic-files.com/meta/servers";

/// Largest directory response an adapter will buffer.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Source unavailable: the directory could not be reached, answered non-2xx, or sent garbage.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response body exceeds {0} bytes")]
    TooLarge(usize),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    /// Fetches the current server list, stamping every snapshot with `collected_at`.
    async fn fetch(&self, collected_at: DateTime<Utc>) -> Result<Vec<Snapshot>, SourceError>;
}

/// Shared HTTP client for all adapters.
pub fn http_client(request_timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .user_agent(crate::version::user_agent())
        .build()?;
    Ok(client)
}

/// Builds the adapters listed in `sources.enabled`, in that order, skipping duplicates.
pub fn from_config(config: &SourcesConfig, client: reqwest::Client) -> Vec<Arc<dyn SourceAdapter>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(config.enabled.len());
    for &source in &config.enabled {
        if adapters.iter().any(|a| a.source() == source) {
            continue;
        }
        let url = config.url_for(source).to_string();
        let max = config.max_body_bytes;
        let adapter: Arc<dyn SourceAdapter> = match source {
            Source::Ragemp => {
                Arc::new(RagempAdapter::new(client.clone(), url).with_max_body_bytes(max))
            }
            Source::Altv => Arc::new(AltvAdapter::new(client.clone(), url).with_max_body_bytes(max)),
            Source::Majestic => {
                Arc::new(MajesticAdapter::new(client.clone(), url).with_max_body_bytes(max))
            }
        };
        adapters.push(adapter);
    }
    adapters
}

/// GETs `url` and decodes the body, refusing to buffer more than `max_body_bytes`.
async fn fetch_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    max_body_bytes: usize,
) -> Result<T, SourceError> {
    let mut resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Status(status));
    }
    if resp
        .content_length()
        .is_some_and(|len| len > max_body_bytes as u64)
    {
        return Err(SourceError::TooLarge(max_body_bytes));
    }
    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if body.len() + chunk.len() > max_body_bytes {
            return Err(SourceError::TooLarge(max_body_bytes));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(serde_json::from_slice(&body)?)
}

/// Upstream counts are signed; a negative count means "unknown" and is stored as 0.
fn players(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

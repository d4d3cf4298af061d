// alt:V master list: a JSON array of servers carrying their own address.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{DEFAULT_MAX_BODY_BYTES, SourceAdapter, SourceError, fetch_json, players};
use crate::models::{Snapshot, Source};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AltvServer {
    #[serde(default)]
    name: String,
    #[serde(default)]
    game_mode: String,
    #[serde(default)]
    website: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    players_count: i64,
    address: String,
}

pub struct AltvAdapter {
    client: reqwest::Client,
    url: String,
    max_body_bytes: usize,
}

impl AltvAdapter {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self {
            client,
            url,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

#[async_trait]
impl SourceAdapter for AltvAdapter {
    fn source(&self) -> Source {
        Source::Altv
    }

    async fn fetch(&self, collected_at: DateTime<Utc>) -> Result<Vec<Snapshot>, SourceError> {
        let servers: Vec<AltvServer> = fetch_json(&self.client, &self.url, self.max_body_bytes).await?;
        Ok(into_snapshots(servers, collected_at))
    }
}

fn into_snapshots(servers: Vec<AltvServer>, collected_at: DateTime<Utc>) -> Vec<Snapshot> {
    servers
        .into_iter()
        .map(|s| Snapshot {
            source: Source::Altv,
            host: s.address,
            name: s.name,
            url: s.website,
            gamemode: s.game_mode,
            language: s.language,
            players_count: players(s.players_count),
            collected_at,
        })
        .collect()
}

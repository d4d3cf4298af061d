// RAGE Multiplayer master list: a JSON object keyed by "ip:port".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{DEFAULT_MAX_BODY_BYTES, SourceAdapter, SourceError, fetch_json, players};
use crate::models::{Snapshot, Source};

#[derive(Debug, Deserialize)]
struct RagempServer {
    #[serde(default)]
    name: String,
    #[serde(default)]
    gamemode: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    lang: String,
    #[serde(default)]
    players: i64,
}

pub struct RagempAdapter {
    client: reqwest::Client,
    url: String,
    max_body_bytes: usize,
}

impl RagempAdapter {
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
impl SourceAdapter for RagempAdapter {
    fn source(&self) -> Source {
        Source::Ragemp
    }

    async fn fetch(&self, collected_at: DateTime<Utc>) -> Result<Vec<Snapshot>, SourceError> {
        let servers: BTreeMap<String, RagempServer> = fetch_json(&self.client, &self.url, self.max_body_bytes).await?;
        Ok(into_snapshots(servers, collected_at))
    }
}

fn into_snapshots(
    servers: BTreeMap<String, RagempServer>,
    collected_at: DateTime<Utc>,
) -> Vec<Snapshot> {
    servers
        .into_iter()
        .map(|(host, s)| Snapshot {
            source: Source::Ragemp,
            host,
            name: s.name,
            url: s.url,
            gamemode: s.gamemode,
            language: s.lang,
            players_count: players(s.players),
            collected_at,
        })
        .collect()
}

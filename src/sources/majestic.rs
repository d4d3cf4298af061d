// Majestic RP server list: an envelope with `result.servers`. One project, so URL and
// game mode are fixed and the country code stands in for the language.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{DEFAULT_MAX_BODY_BYTES, SourceAdapter, SourceError, fetch_json, players};
use crate::models::{Snapshot, Source};

const MAJESTIC_SITE_URL: &str = "https://majestic-rp.ru";
const MAJESTIC_GAMEMODE: &str = "Roleplay";

#[derive(Debug, Deserialize)]
struct ServersResponse {
    result: ServersResult,
}

#[derive(Debug, Deserialize)]
struct ServersResult {
    #[serde(default)]
    servers: Vec<MajesticServer>,
}

#[derive(Debug, Deserialize)]
struct MajesticServer {
    #[serde(default)]
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    players: i64,
    ip: String,
}

pub struct MajesticAdapter {
    client: reqwest::Client,
    url: String,
    max_body_bytes: usize,
}

impl MajesticAdapter {
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
impl SourceAdapter for MajesticAdapter {
    fn source(&self) -> Source {
        Source::Majestic
    }

    async fn fetch(&self, collected_at: DateTime<Utc>) -> Result<Vec<Snapshot>, SourceError> {
        let resp: ServersResponse = fetch_json(&self.client, &self.url, self.max_body_bytes).await?;
        Ok(into_snapshots(resp.result.servers, collected_at))
    }
}

fn into_snapshots(servers: Vec<MajesticServer>, collected_at: DateTime<Utc>) -> Vec<Snapshot> {
    servers
        .into_iter()
        .map(|s| Snapshot {
            source: Source::Majestic,
            host: s.ip,
            name: s.name,
            url: MAJESTIC_SITE_URL.into(),
            gamemode: MAJESTIC_GAMEMODE.into(),
            language: s.country,
            players_count: players(s.players),
            collected_at,
        })
        .collect()
}

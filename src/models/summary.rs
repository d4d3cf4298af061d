// Read-side values derived from the store on every request (never cached)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Snapshot, Source};

/// Total players of one source in the current interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub source: Source,
    pub players_count: i64,
}

/// One row of the per-source server listing. Offline servers report 0 players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSummary {
    pub host: String,
    pub name: String,
    pub players_count: i64,
}

/// Latest stored snapshot of a (source, host) pair.
pub type ServerDetail = Snapshot;

/// Average player count of one hour or day bucket; `collected_at` is the bucket start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticPoint {
    pub players_count: i64,
    pub collected_at: DateTime<Utc>,
}

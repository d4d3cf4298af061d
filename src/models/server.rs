// Source identifiers and the canonical server snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One external game-server directory. Serializes to lowercase JSON (e.g. "ragemp").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Ragemp,
    Altv,
    Majestic,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Ragemp, Source::Altv, Source::Majestic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ragemp => "ragemp",
            Source::Altv => "altv",
            Source::Majestic => "majestic",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source {0:?}")]
pub struct UnknownSource(pub String);

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ragemp" => Ok(Source::Ragemp),
            "altv" => Ok(Source::Altv),
            "majestic" => Ok(Source::Majestic),
            _ => Err(UnknownSource(s.to_string())),
        }
    }
}

/// One observation of one server at one collection instant.
/// `collected_at` is the interval boundary of the tick that produced it, never the fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub source: Source,
    pub host: String,
    pub name: String,
    pub url: String,
    pub gamemode: String,
    pub language: String,
    pub players_count: u32,
    pub collected_at: DateTime<Utc>,
}

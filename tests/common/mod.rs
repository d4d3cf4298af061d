// Shared test helpers: snapshot builders, scripted fakes and a temp-dir store
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gdatum::metrics::CollectorStats;
use gdatum::models::{Snapshot, Source};
use gdatum::retry::RetryPolicy;
use gdatum::server_repo::{ServerRepo, SnapshotWriter};
use gdatum::sources::{SourceAdapter, SourceError};
use prometheus::Registry;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Hour boundary at 2025-06-15T12:00:00Z plus `hours`.
pub fn hour(hours: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_749_988_800 + hours * 3600, 0).unwrap()
}

pub fn snapshot(source: Source, host: &str, players: u32, at: DateTime<Utc>) -> Snapshot {
    Snapshot {
        source,
        host: host.into(),
        name: format!("{} server", host),
        url: format!("https://{}.example", host.replace(':', "-")),
        gamemode: "roleplay".into(),
        language: "en".into(),
        players_count: players,
        collected_at: at,
    }
}

/// Collector stats backed by a private registry.
pub fn new_stats() -> Arc<CollectorStats> {
    Arc::new(CollectorStats::new(&Registry::new()).unwrap())
}

pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1))
}

pub async fn temp_repo() -> (TempDir, Arc<ServerRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gdatum.db");
    let repo = ServerRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}

/// What a `FakeAdapter` does on each call.
#[derive(Clone)]
pub enum Script {
    /// Returns one snapshot per host.
    Ok(Vec<&'static str>),
    /// Fails with a non-2xx status every time.
    Fail,
    /// Fails until the given attempt number, then returns the hosts.
    FailUntil(u32, Vec<&'static str>),
    /// Never answers.
    Hang,
    /// Panics inside the fetch.
    Panic,
}

pub struct FakeAdapter {
    pub source: Source,
    pub script: Script,
    pub calls: AtomicU32,
}

impl FakeAdapter {
    pub fn new(source: Source, script: Script) -> Arc<Self> {
        Arc::new(Self {
            source,
            script,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

fn hosts_to_snapshots(
    source: Source,
    hosts: &[&str],
    collected_at: DateTime<Utc>,
) -> Vec<Snapshot> {
    hosts
        .iter()
        .map(|h| snapshot(source, h, 10, collected_at))
        .collect()
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self, collected_at: DateTime<Utc>) -> Result<Vec<Snapshot>, SourceError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.script {
            Script::Ok(hosts) => Ok(hosts_to_snapshots(self.source, hosts, collected_at)),
            Script::Fail => Err(SourceError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            )),
            Script::FailUntil(n, hosts) => {
                if attempt < *n {
                    Err(SourceError::Status(reqwest::StatusCode::BAD_GATEWAY))
                } else {
                    Ok(hosts_to_snapshots(self.source, hosts, collected_at))
                }
            }
            Script::Hang => {
                std::future::pending::<()>().await;
                Ok(Vec::new())
            }
            Script::Panic => panic!("{} adapter blew up", self.source),
        }
    }
}

/// Records every batch; fails the first `fail_first` calls.
#[derive(Default)]
pub struct FakeWriter {
    pub fail_first: u32,
    pub calls: AtomicU32,
    pub batches: Mutex<Vec<Vec<Snapshot>>>,
}

impl FakeWriter {
    pub fn failing(fail_first: u32) -> Arc<Self> {
        Arc::new(Self {
            fail_first,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotWriter for FakeWriter {
    async fn insert_snapshots(&self, snapshots: &[Snapshot]) -> anyhow::Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_first {
            anyhow::bail!("store unavailable (call {})", call);
        }
        self.batches.lock().unwrap().push(snapshots.to_vec());
        Ok(())
    }
}

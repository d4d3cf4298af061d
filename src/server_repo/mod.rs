// SQLite store for server snapshots. Writes only append to servers_metrics_raw;
// reads aggregate over the views declared in `schema`. Timestamps are Unix seconds (UTC).

pub mod schema;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

use crate::models::{
    ListParams, ServerDetail, ServerSummary, Snapshot, Source, SourceSummary, StatisticPoint,
    StatisticsParams,
};

/// Write side of the store, used by the persistence gateway.
#[async_trait]
pub trait SnapshotWriter: Send + Sync {
    /// Writes the whole batch or nothing.
    async fn insert_snapshots(&self, snapshots: &[Snapshot]) -> anyhow::Result<()>;
}

/// Read side of the store, used by the query layer. Parameters arrive already validated.
#[async_trait]
pub trait ServerReader: Send + Sync {
    async fn list_source_summaries(
        &self,
        current_interval: DateTime<Utc>,
        players_order_asc: bool,
    ) -> anyhow::Result<Vec<SourceSummary>>;

    async fn list_server_summaries(
        &self,
        params: &ListParams,
        current_interval: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ServerSummary>>;

    async fn get_server(&self, source: Source, host: &str)
    -> anyhow::Result<Option<ServerDetail>>;

    async fn list_server_statistics(
        &self,
        params: &StatisticsParams,
    ) -> anyhow::Result<Vec<StatisticPoint>>;

    async fn server_exists(&self, source: Source, host: &str) -> anyhow::Result<bool>;
}

const INSERT_SNAPSHOT: &str = "INSERT INTO servers_metrics_raw (source, host, name, language, gamemode, url, players_count, collected_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

const LIST_SOURCE_SUMMARIES: &str = r#"
    SELECT source, SUM(players_count) AS total_players
    FROM servers_online
    WHERE collected_at = $1
    GROUP BY source
    ORDER BY CASE WHEN $2 THEN SUM(players_count) ELSE -SUM(players_count) END ASC, source ASC
"#;

const LIST_SERVER_SUMMARIES: &str = r#"
    SELECT i.host AS host, i.name AS name, COALESCE(o.players_count, 0) AS current_players
    FROM servers_info i
    LEFT JOIN servers_online o
        ON o.source = i.source AND o.host = i.host AND o.collected_at = $2
    WHERE i.source = $1 AND ($3 OR o.players_count IS NOT NULL)
    ORDER BY
        CASE WHEN $4 THEN COALESCE(o.players_count, 0) ELSE -COALESCE(o.players_count, 0) END ASC,
        i.host ASC
    LIMIT $5 OFFSET $6
"#;

const GET_SERVER: &str = r#"
    SELECT source, host, name, language, gamemode, url, players_count, collected_at
    FROM servers_metrics_raw
    WHERE source = $1 AND host = $2
    ORDER BY collected_at DESC, id DESC
    LIMIT 1
"#;

// $3 is the bucket width in seconds; integer division truncates to the bucket start.
const LIST_SERVER_STATISTICS: &str = r#"
    SELECT (collected_at / $3) * $3 AS bucket, CAST(AVG(players_count) AS INTEGER) AS avg_players
    FROM servers_online
    WHERE source = $1 AND host = $2 AND collected_at >= $4 AND collected_at < $5
    GROUP BY bucket
    ORDER BY bucket DESC
"#;

const SERVER_EXISTS: &str =
    "SELECT EXISTS(SELECT 1 FROM servers_metrics_raw WHERE source = $1 AND host = $2)";

pub struct ServerRepo {
    pool: SqlitePool,
}

impl ServerRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        schema::init_schema(&self.pool).await
    }

    /// Number of rows in the raw log (diagnostics and tests).
    pub async fn count_raw_rows(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM servers_metrics_raw")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    fn parse_snapshot_row(row: &SqliteRow) -> anyhow::Result<Snapshot> {
        let source: String = row.try_get("source")?;
        let players_count: i64 = row.try_get("players_count")?;
        let collected_at: i64 = row.try_get("collected_at")?;
        Ok(Snapshot {
            source: source.parse()?,
            host: row.try_get("host")?,
            name: row.try_get("name")?,
            url: row.try_get("url")?,
            gamemode: row.try_get("gamemode")?,
            language: row.try_get("language")?,
            players_count: u32::try_from(players_count)?,
            collected_at: timestamp(collected_at)?,
        })
    }
}

fn timestamp(secs: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {}", secs))
}

#[async_trait]
impl SnapshotWriter for ServerRepo {
    #[instrument(skip(self, snapshots), fields(repo = "servers", operation = "insert_snapshots", snapshots_count = snapshots.len()))]
    async fn insert_snapshots(&self, snapshots: &[Snapshot]) -> anyhow::Result<()> {
        if snapshots.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for s in snapshots {
            sqlx::query(INSERT_SNAPSHOT)
                .bind(s.source.as_str())
                .bind(&s.host)
                .bind(&s.name)
                .bind(&s.language)
                .bind(&s.gamemode)
                .bind(&s.url)
                .bind(s.players_count as i64)
                .bind(s.collected_at.timestamp())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ServerReader for ServerRepo {
    #[instrument(skip(self), fields(repo = "servers", operation = "list_source_summaries"))]
    async fn list_source_summaries(
        &self,
        current_interval: DateTime<Utc>,
        players_order_asc: bool,
    ) -> anyhow::Result<Vec<SourceSummary>> {
        let rows = sqlx::query(LIST_SOURCE_SUMMARIES)
            .bind(current_interval.timestamp())
            .bind(players_order_asc)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let source: String = row.try_get("source")?;
            out.push(SourceSummary {
                source: source.parse()?,
                players_count: row.try_get("total_players")?,
            });
        }
        Ok(out)
    }

    #[instrument(skip(self), fields(repo = "servers", operation = "list_server_summaries"))]
    async fn list_server_summaries(
        &self,
        params: &ListParams,
        current_interval: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ServerSummary>> {
        let rows = sqlx::query(LIST_SERVER_SUMMARIES)
            .bind(params.source.as_str())
            .bind(current_interval.timestamp())
            .bind(params.include_offline)
            .bind(params.players_order_asc)
            .bind(params.limit)
            .bind(params.offset)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(ServerSummary {
                host: row.try_get("host")?,
                name: row.try_get("name")?,
                players_count: row.try_get("current_players")?,
            });
        }
        Ok(out)
    }

    #[instrument(skip(self), fields(repo = "servers", operation = "get_server"))]
    async fn get_server(
        &self,
        source: Source,
        host: &str,
    ) -> anyhow::Result<Option<ServerDetail>> {
        let row = sqlx::query(GET_SERVER)
            .bind(source.as_str())
            .bind(host)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Self::parse_snapshot_row(&row)?))
    }

    #[instrument(skip(self), fields(repo = "servers", operation = "list_server_statistics"))]
    async fn list_server_statistics(
        &self,
        params: &StatisticsParams,
    ) -> anyhow::Result<Vec<StatisticPoint>> {
        let rows = sqlx::query(LIST_SERVER_STATISTICS)
            .bind(params.source.as_str())
            .bind(&params.host)
            .bind(params.precision.bucket_secs())
            .bind(params.time_range.from.timestamp())
            .bind(params.time_range.to.timestamp())
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let bucket: i64 = row.try_get("bucket")?;
            out.push(StatisticPoint {
                players_count: row.try_get("avg_players")?,
                collected_at: timestamp(bucket)?,
            });
        }
        Ok(out)
    }

    async fn server_exists(&self, source: Source, host: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, i64>(SERVER_EXISTS)
            .bind(source.as_str())
            .bind(host)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists != 0)
    }
}

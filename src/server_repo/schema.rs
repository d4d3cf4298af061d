// Store layout: one append-only raw log plus two views derived from it.
//   servers_metrics_raw  every snapshot ever inserted (write target)
//   servers_info         latest name/url/gamemode/language per (source, host)
//   servers_online       one player count per (source, host, collected_at)

use sqlx::SqlitePool;

const RAW_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS servers_metrics_raw (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT NOT NULL,
        host TEXT NOT NULL,
        name TEXT NOT NULL,
        language TEXT NOT NULL,
        gamemode TEXT NOT NULL,
        url TEXT NOT NULL,
        players_count INTEGER NOT NULL CHECK (players_count >= 0),
        collected_at INTEGER NOT NULL
    )
"#;

const RAW_INDEX_SERVER: &str = "CREATE INDEX IF NOT EXISTS idx_raw_source_host_collected_at ON servers_metrics_raw(source, host, collected_at)";

const RAW_INDEX_COLLECTED_AT: &str = "CREATE INDEX IF NOT EXISTS idx_raw_collected_at ON servers_metrics_raw(collected_at)";

// SQLite takes bare columns from the row holding MAX() in a GROUP BY, so this is the latest row.
const INFO_VIEW: &str = r#"
    CREATE VIEW IF NOT EXISTS servers_info AS
    SELECT source, host, name, language, gamemode, url, MAX(collected_at) AS last_seen_at
    FROM servers_metrics_raw
    GROUP BY source, host
"#;

// Re-inserted ticks must not double a server's count, hence MAX rather than SUM.
const ONLINE_VIEW: &str = r#"
    CREATE VIEW IF NOT EXISTS servers_online AS
    SELECT source, host, collected_at, MAX(players_count) AS players_count
    FROM servers_metrics_raw
    GROUP BY source, host, collected_at
"#;

/// Creates the raw table, its indexes and both views if not present.
pub async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    for statement in [
        RAW_TABLE,
        RAW_INDEX_SERVER,
        RAW_INDEX_COLLECTED_AT,
        INFO_VIEW,
        ONLINE_VIEW,
    ] {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

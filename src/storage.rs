//! SQLite run history.
//!
//! Every analysis run (burn severity or timelapse) is recorded with its
//! session, timing and outcome. Artifacts themselves are never stored here;
//! they live in temporary files owned by the session.

use chrono::{DateTime, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::model::{RunKind, RunRecord};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:burnscope.db"
    ///   or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // in-memory databases are per connection
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session TEXT NOT NULL,
                kind TEXT NOT NULL,
                started_at INTEGER NOT NULL,
                finished_at INTEGER NOT NULL,
                outcome TEXT NOT NULL,
                message TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_runs_finished_at
            ON runs(finished_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a run to the history.
    pub async fn insert_run(&self, run: &RunRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO runs (session, kind, started_at, finished_at, outcome, message)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.session)
        .bind(run.kind.as_str())
        .bind(run.started_at.timestamp_millis())
        .bind(run.finished_at.timestamp_millis())
        .bind(&run.outcome)
        .bind(&run.message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent runs first.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of runs to return
    pub async fn recent_runs(&self, limit: u32) -> anyhow::Result<Vec<RunRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT session, kind, started_at, finished_at, outcome, message
            FROM runs
            ORDER BY finished_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let kind: String = row.get("kind");
                Ok(RunRecord {
                    session: row.get("session"),
                    kind: RunKind::parse(&kind)
                        .ok_or_else(|| anyhow::anyhow!("unknown run kind {kind:?}"))?,
                    started_at: from_millis(row.get("started_at"))?,
                    finished_at: from_millis(row.get("finished_at"))?,
                    outcome: row.get("outcome"),
                    message: row.get("message"),
                })
            })
            .collect()
    }
}

fn from_millis(ms: i64) -> anyhow::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid timestamp {ms}"))
}

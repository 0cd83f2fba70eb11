//! SQLite-based run history store

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::core::outcome::PipelineStatus;
use crate::persistence::{PersistenceBackend, RunRecord};

/// SQLite run history store
pub struct SqliteRunStore {
    pool: SqlitePool,
}

impl SqliteRunStore {
    /// Open (or create) a store at the given path
    pub async fn new(db_path: &str) -> Result<Self> {
        let url = if db_path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            // mode=rwc creates the database file on first use
            format!("sqlite:{}?mode=rwc", db_path)
        };
        let pool = SqlitePool::connect(&url)
            .await
            .context("Failed to connect to history database")?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Open the store at the platform data directory
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("jobrun");
        std::fs::create_dir_all(&db_dir)
            .with_context(|| format!("failed to create {}", db_dir.display()))?;

        let db_path = db_dir.join("runs.db");
        Self::new(&db_path.to_string_lossy()).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                pipeline_name TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                duration_ms INTEGER NOT NULL DEFAULT 0,
                steps_run INTEGER NOT NULL DEFAULT 0,
                succeeded INTEGER NOT NULL DEFAULT 0,
                failed INTEGER NOT NULL DEFAULT 0,
                skipped INTEGER NOT NULL DEFAULT 0,
                first_failure TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_runs_pipeline_name ON runs(pipeline_name);
            CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RunRecord> {
        Ok(RunRecord {
            run_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            pipeline_name: row.get("pipeline_name"),
            status: PipelineStatus::parse(&row.get::<String, _>("status"))
                .unwrap_or(PipelineStatus::Failed),
            started_at: Self::from_naive(row.get("started_at")),
            duration_ms: row.get::<i64, _>("duration_ms") as u64,
            steps_run: row.get::<i64, _>("steps_run") as usize,
            succeeded: row.get::<i64, _>("succeeded") as usize,
            failed: row.get::<i64, _>("failed") as usize,
            skipped: row.get::<i64, _>("skipped") as usize,
            first_failure: row.get("first_failure"),
        })
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for SqliteRunStore {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO runs
            (id, pipeline_name, status, started_at, duration_ms, steps_run, succeeded, failed, skipped, first_failure)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(record.run_id.to_string())
        .bind(&record.pipeline_name)
        .bind(record.status.as_str())
        .bind(Self::to_naive(record.started_at))
        .bind(record.duration_ms as i64)
        .bind(record.steps_run as i64)
        .bind(record.succeeded as i64)
        .bind(record.failed as i64)
        .bind(record.skipped as i64)
        .bind(record.first_failure.as_deref())
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, pipeline_name, status, started_at, duration_ms, steps_run, succeeded, failed, skipped, first_failure
            FROM runs
            WHERE id = ?1
            "#,
        )
        .bind(run_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load run")?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn list_runs(&self, pipeline_name: &str) -> Result<Vec<RunRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, pipeline_name, status, started_at, duration_ms, steps_run, succeeded, failed, skipped, first_failure
            FROM runs
            WHERE pipeline_name = ?1
            ORDER BY started_at DESC
            "#,
        )
        .bind(pipeline_name)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list runs")?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT pipeline_name
            FROM runs
            ORDER BY pipeline_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pipelines")?;

        Ok(rows.iter().map(|row| row.get("pipeline_name")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pipeline: &str, status: PipelineStatus) -> RunRecord {
        RunRecord {
            run_id: Uuid::new_v4(),
            pipeline_name: pipeline.to_string(),
            status,
            started_at: Utc::now(),
            duration_ms: 2500,
            steps_run: 4,
            succeeded: 3,
            failed: 1,
            skipped: 0,
            first_failure: Some("coverage".to_string()),
        }
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let store = SqliteRunStore::new(":memory:").await.unwrap();
        let rec = record("ci", PipelineStatus::Failed);

        store.save_run(&rec).await.unwrap();
        let loaded = store.load_run(rec.run_id).await.unwrap().unwrap();

        assert_eq!(loaded.pipeline_name, rec.pipeline_name);
        assert_eq!(loaded.status, rec.status);
        assert_eq!(loaded.steps_run, 4);
        assert_eq!(loaded.first_failure.as_deref(), Some("coverage"));
    }

    #[tokio::test]
    async fn test_sqlite_lists_most_recent_first() {
        let store = SqliteRunStore::new(":memory:").await.unwrap();

        let mut old = record("ci", PipelineStatus::Succeeded);
        old.started_at = Utc::now() - chrono::Duration::hours(2);
        let new = record("ci", PipelineStatus::Failed);

        store.save_run(&old).await.unwrap();
        store.save_run(&new).await.unwrap();

        let runs = store.list_runs("ci").await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, new.run_id);
        assert_eq!(store.list_pipelines().await.unwrap(), vec!["ci".to_string()]);
    }

    #[tokio::test]
    async fn test_sqlite_missing_run_is_none() {
        let store = SqliteRunStore::new(":memory:").await.unwrap();
        assert!(store.load_run(Uuid::new_v4()).await.unwrap().is_none());
    }
}

//! SQLite-backed task store (sqlx, WAL mode).

use std::path::Path;
use std::str::FromStr as _;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::task::{Task, TaskStatus};

/// Schema creation is idempotent — ALTERs would follow the same pattern if
/// the table ever grows columns.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        result TEXT,
        error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks (created_at DESC)",
];

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: String,
    status: String,
    result: Option<String>,
    error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn into_task(self) -> Result<Task, StoreError> {
        let status = TaskStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("unrecognized status {:?}", self.status)))?;
        let result = match self.result {
            Some(s) if !s.is_empty() => Some(serde_json::value::RawValue::from_string(s)?),
            _ => None,
        };
        let error = self.error.filter(|e| !e.is_empty());
        Ok(Task {
            id: self.id,
            status,
            result,
            error,
            created_at: parse_rfc3339(&self.created_at)?,
            updated_at: parse_rfc3339(&self.updated_at)?,
        })
    }
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {s:?}: {e}")))
}

/// Task store backed by a SQLite database file under the data directory.
///
/// Timestamps are stored as RFC 3339 TEXT, so `ORDER BY created_at` is
/// chronological. The connection pool is the only shared resource and is
/// safe for concurrent use by overlapping background executions and
/// API requests.
#[derive(Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    /// Open (creating if missing) the database at `{data_dir}/taskd.db` and
    /// ensure the schema exists.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("create data dir {}", data_dir.display()))?;
        let db_path = data_dir.join("taskd.db");
        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&pool)
                .await
                .context("apply tasks schema")?;
        }
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, task: &mut Task) -> Result<(), StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO tasks (id, status, result, error, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(task.status.as_str())
        .bind(task.result.as_deref().map(|r| r.get()))
        .bind(task.error.as_deref())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        task.id = id;
        task.created_at = now;
        task.updated_at = now;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Task, StoreError> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(StoreError::NotFound)?.into_task()
    }

    async fn update(&self, task: &mut Task) -> Result<(), StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, result = ?, error = ?, updated_at = ? WHERE id = ?",
        )
        .bind(task.status.as_str())
        .bind(task.result.as_deref().map(|r| r.get()))
        .bind(task.error.as_deref())
        .bind(now.to_rfc3339())
        .bind(&task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        task.updated_at = now;
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Task>, StoreError> {
        let limit = limit.max(0);
        let offset = offset.max(0);
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT * FROM tasks ORDER BY created_at DESC LIMIT ? OFFSET ?")
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }
}

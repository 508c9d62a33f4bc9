//! Durable persistence for task records.
//!
//! [`TaskStore`] is the seam between the lifecycle engine and whatever
//! backend holds the records. The daemon runs on [`sqlite::SqliteTaskStore`];
//! [`memory::MemoryTaskStore`] backs the tests.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::task::Task;

/// Errors surfaced by a [`TaskStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed stored payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("corrupt task row: {0}")]
    Corrupt(String),
}

/// CRUD over task records, polymorphic over the persistence backend.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a freshly built pending task. Fills in `id`, `created_at`
    /// and `updated_at` on the caller's task.
    async fn create(&self, task: &mut Task) -> Result<(), StoreError>;

    /// Fetch the current record for `id`. [`StoreError::NotFound`] when no
    /// such task exists — never a zero-valued task.
    async fn get_by_id(&self, id: &str) -> Result<Task, StoreError>;

    /// Persist the full current state of an existing task, matched by `id`.
    /// `updated_at` is refreshed to the time of the write and the new value
    /// is written back into the caller's task.
    async fn update(&self, task: &mut Task) -> Result<(), StoreError>;

    /// Up to `limit` tasks ordered by `created_at` descending, skipping the
    /// first `offset`. Negative values are clamped to zero before they reach
    /// the backend. Empty vec when nothing matches.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Task>, StoreError>;
}

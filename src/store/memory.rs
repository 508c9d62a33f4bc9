//! In-memory task store, used as the test double for the engine and the
//! HTTP layer. Mirrors the SQLite store's clamp and ordering semantics.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, TaskStore};
use crate::task::Task;

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: &mut Task) -> Result<(), StoreError> {
        let now = Utc::now();
        task.id = Uuid::new_v4().to_string();
        task.created_at = now;
        task.updated_at = now;
        self.tasks
            .write()
            .await
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Task, StoreError> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, task: &mut Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let stored = tasks.get_mut(&task.id).ok_or(StoreError::NotFound)?;
        task.created_at = stored.created_at; // immutable after create
        task.updated_at = Utc::now();
        *stored = task.clone();
        Ok(())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Task>, StoreError> {
        let limit = limit.max(0) as usize;
        let offset = offset.max(0) as usize;
        let tasks = self.tasks.read().await;
        let mut all: Vec<Task> = tasks.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }
}

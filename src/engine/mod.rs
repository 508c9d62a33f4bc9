//! Task lifecycle engine.
//!
//! Owns the state machine `pending → processing → completed | failed` and
//! the single background execution dispatched per created task. The engine
//! knows nothing about HTTP and nothing about the work beyond the
//! [`WorkFn`] signature: an opaque success payload or an error.
//!
//! Execution is fire-and-forget through the [`Spawner`] capability, so the
//! engine is portable across runtimes. There is no pool, no queue and no
//! concurrency limit — each created task rides its own spawned unit.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::value::RawValue;
use tracing::{error, info};

use crate::store::{StoreError, TaskStore};
use crate::task::{Task, TaskStatus};

/// Default page size when the caller supplies no (or garbage) pagination.
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// Outcome of one invocation of the injected work function.
pub type WorkResult = Result<Box<RawValue>, anyhow::Error>;

/// The injected long-running operation a task represents. Invoked once per
/// task with no deadline and no cancellation hook; once dispatched it runs
/// to completion.
pub type WorkFn = Arc<dyn Fn() -> BoxFuture<'static, WorkResult> + Send + Sync>;

/// Minimal executor capability: accepts a unit of work and runs it on an
/// unspecified thread, independent of the caller.
pub trait Spawner: Send + Sync {
    fn spawn(&self, work: BoxFuture<'static, ()>);
}

/// [`Spawner`] backed by the ambient tokio runtime.
pub struct TokioSpawner;

impl Spawner for TokioSpawner {
    fn spawn(&self, work: BoxFuture<'static, ()>) {
        tokio::spawn(work);
    }
}

/// Orchestrates task creation, async execution and status transitions.
pub struct TaskEngine {
    store: Arc<dyn TaskStore>,
    work: WorkFn,
    spawner: Arc<dyn Spawner>,
}

impl TaskEngine {
    pub fn new(store: Arc<dyn TaskStore>, work: WorkFn) -> Self {
        Self::with_spawner(store, work, Arc::new(TokioSpawner))
    }

    pub fn with_spawner(store: Arc<dyn TaskStore>, work: WorkFn, spawner: Arc<dyn Spawner>) -> Self {
        Self {
            store,
            work,
            spawner,
        }
    }

    /// Persist a new pending task and dispatch its background execution.
    ///
    /// Returns the freshly persisted pending task without waiting for
    /// execution. If the create fails, nothing is dispatched.
    pub async fn create_task(&self) -> Result<Task, StoreError> {
        let mut task = Task::pending();
        self.store.create(&mut task).await?;
        info!(id = %task.id, "task created");

        let store = self.store.clone();
        let work = self.work.clone();
        let id = task.id.clone();
        self.spawner
            .spawn(Box::pin(async move { run_task(store, work, id).await }));

        Ok(task)
    }

    /// Current record for `id`. `NotFound` and backend errors surface
    /// unchanged.
    pub async fn get_task(&self, id: &str) -> Result<Task, StoreError> {
        self.store.get_by_id(id).await
    }

    /// Page of tasks, newest first. Absent or invalid pagination falls back
    /// to `limit = 10, offset = 0` — normalized, never rejected.
    pub async fn list_tasks(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Task>, StoreError> {
        let (limit, offset) = normalize_page(limit, offset);
        self.store.list(limit, offset).await
    }
}

/// Fold absent and invalid pagination inputs into the defaults.
fn normalize_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = match limit {
        Some(l) if l > 0 => l,
        _ => DEFAULT_LIST_LIMIT,
    };
    let offset = match offset {
        Some(o) if o >= 0 => o,
        _ => 0,
    };
    (limit, offset)
}

/// The background execution: one strictly ordered write sequence per task id.
///
/// Persistence failures end the execution without retry. A failed
/// transition to `processing` leaves the task stranded in `pending`; a
/// failed terminal update leaves it stranded in `processing`. Both outcomes
/// are logged only — there is deliberately no retry that would change the
/// observable write sequence.
async fn run_task(store: Arc<dyn TaskStore>, work: WorkFn, id: String) {
    let mut task = match store.get_by_id(&id).await {
        Ok(task) => task,
        Err(err) => {
            error!(id = %id, err = %err, "failed to load task for execution");
            return;
        }
    };

    task.status = TaskStatus::Processing;
    if let Err(err) = store.update(&mut task).await {
        error!(id = %id, err = %err, "failed to mark task processing");
        return;
    }

    match (work)().await {
        Ok(result) => {
            task.status = TaskStatus::Completed;
            task.result = Some(result);
        }
        Err(err) => {
            // A failing work function is a successful outcome of a failed
            // unit of work, not an engine error.
            task.status = TaskStatus::Failed;
            task.error = Some(err.to_string());
        }
    }

    if let Err(err) = store.update(&mut task).await {
        error!(id = %id, err = %err, "failed to persist task outcome");
        return;
    }
    info!(id = %id, status = %task.status, "task finished");
}

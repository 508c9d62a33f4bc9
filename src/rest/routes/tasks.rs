// rest/routes/tasks.rs — Task REST routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::task::Task;
use crate::AppContext;

type ApiError = (StatusCode, Json<Value>);

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    match ctx.engine.create_task().await {
        Ok(task) => Ok((StatusCode::CREATED, Json(task))),
        Err(e) => {
            error!(err = %e, "failed to create task");
            Err(internal_error("Failed to create task"))
        }
    }
}

// All store failures surface as 500 here, unknown ids included — that is
// the service's published contract (see DESIGN.md).
pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    match ctx.engine.get_task(&id).await {
        Ok(task) => Ok(Json(task)),
        Err(e) => {
            error!(id = %id, err = %e, "failed to get task");
            Err(internal_error("Failed to get task"))
        }
    }
}

/// Pagination arrives as raw strings so that non-numeric garbage falls back
/// to the defaults instead of being a 400.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let limit = params.limit.as_deref().and_then(|s| s.parse::<i64>().ok());
    let offset = params.offset.as_deref().and_then(|s| s.parse::<i64>().ok());

    match ctx.engine.list_tasks(limit, offset).await {
        Ok(tasks) => Ok(Json(tasks)),
        Err(e) => {
            error!(err = %e, "failed to list tasks");
            Err(internal_error("Failed to list tasks"))
        }
    }
}

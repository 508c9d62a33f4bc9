// rest/mod.rs — Public HTTP API server.
//
// Endpoints:
//   POST /api/tasks/           create a task, dispatch its execution
//   GET  /api/tasks/{id}       current record for one task
//   GET  /api/tasks/?limit=&offset=   page of tasks, newest first
//   GET  /health

pub mod routes;

use std::future::IntoFuture as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::AppContext;

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let tasks = get(routes::tasks::list_tasks).post(routes::tasks::create_task);
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/tasks", tasks.clone())
        .route("/api/tasks/", tasks)
        .route("/api/tasks/{id}", get(routes::tasks::get_task))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Serve the API until SIGINT/SIGTERM, then drain in-flight requests for at
/// most `grace`. In-flight background executions are not waited on.
pub async fn serve(ctx: Arc<AppContext>, addr: SocketAddr, grace: Duration) -> Result<()> {
    let router = build_router(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API listening on http://{}", addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let mut drain_rx = shutdown_rx.clone();
    let graceful = axum::serve(listener, router)
        .with_graceful_shutdown({
            let mut rx = shutdown_rx;
            async move {
                let _ = rx.changed().await;
            }
        })
        .into_future();

    tokio::pin!(graceful);
    tokio::select! {
        result = &mut graceful => result?,
        _ = async {
            let _ = drain_rx.changed().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!("grace period elapsed with requests still in flight");
        }
    }
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(err = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(err = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

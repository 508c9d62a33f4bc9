//! HTTP API integration tests. Spins up the router on a random port and
//! speaks HTTP/1.1 over a raw TCP stream.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use taskd::engine::{TaskEngine, WorkFn};
use taskd::rest;
use taskd::store::memory::MemoryTaskStore;
use taskd::task::{Task, TaskStatus};
use taskd::AppContext;

fn succeeding_work() -> WorkFn {
    Arc::new(|| {
        Box::pin(async {
            let payload = serde_json::json!({ "message": "Task completed successfully" });
            Ok(serde_json::value::to_raw_value(&payload)?)
        })
    })
}

fn failing_work() -> WorkFn {
    Arc::new(|| Box::pin(async { Err(anyhow::anyhow!("synthetic work failure")) }))
}

/// Start a server with an in-memory store on a random port.
async fn spawn_server(work: WorkFn) -> u16 {
    let engine = TaskEngine::new(Arc::new(MemoryTaskStore::new()), work);
    let ctx = AppContext::new(engine);
    let router = rest::build_router(ctx);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    port
}

/// One raw HTTP/1.1 exchange. Returns (status code, body).
async fn request(port: u16, method: &str, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let req = format!(
        "{method} {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(req.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8(raw).unwrap();

    let status: u16 = text
        .split_whitespace()
        .nth(1)
        .expect("status line")
        .parse()
        .expect("numeric status");
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}

/// Poll a task until it reaches a terminal state.
async fn wait_for_terminal(port: u16, id: &str) -> Task {
    for _ in 0..100 {
        let (status, body) = request(port, "GET", &format!("/api/tasks/{id}")).await;
        assert_eq!(status, 200);
        let task: Task = serde_json::from_str(&body).unwrap();
        if task.status.is_terminal() {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {id} never reached a terminal state");
}

#[tokio::test]
async fn health_reports_ok() {
    let port = spawn_server(succeeding_work()).await;
    let (status, body) = request(port, "GET", "/health").await;
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn create_returns_201_with_a_pending_task() {
    let port = spawn_server(succeeding_work()).await;
    let (status, body) = request(port, "POST", "/api/tasks/").await;
    assert_eq!(status, 201);

    let task: Task = serde_json::from_str(&body).unwrap();
    assert!(!task.id.is_empty());
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.result.is_none());
    assert!(task.error.is_none());
    // The body omits empty payload fields entirely.
    assert!(!body.contains("\"result\""));
    assert!(!body.contains("\"error\""));
}

#[tokio::test]
async fn created_task_eventually_completes_with_a_result() {
    let port = spawn_server(succeeding_work()).await;
    let (_, body) = request(port, "POST", "/api/tasks").await;
    let created: Task = serde_json::from_str(&body).unwrap();

    let done = wait_for_terminal(port, &created.id).await;
    assert_eq!(done.status, TaskStatus::Completed);
    assert!(done
        .result
        .expect("completed task carries a result")
        .get()
        .contains("Task completed successfully"));
    assert!(done.error.is_none());
    assert_eq!(done.created_at, created.created_at);
    assert!(done.updated_at >= created.updated_at);
}

#[tokio::test]
async fn failing_work_surfaces_as_task_failed_not_http_error() {
    let port = spawn_server(failing_work()).await;
    let (status, body) = request(port, "POST", "/api/tasks/").await;
    assert_eq!(status, 201);
    let created: Task = serde_json::from_str(&body).unwrap();

    let done = wait_for_terminal(port, &created.id).await;
    assert_eq!(done.status, TaskStatus::Failed);
    assert_eq!(done.error.as_deref(), Some("synthetic work failure"));
    assert!(done.result.is_none());
}

#[tokio::test]
async fn get_unknown_task_is_a_500_with_an_error_body() {
    let port = spawn_server(succeeding_work()).await;
    let (status, body) = request(port, "GET", "/api/tasks/not-a-real-id").await;
    assert_eq!(status, 500);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("Failed to get task"));
}

#[tokio::test]
async fn list_pages_newest_first_with_lenient_pagination() {
    let port = spawn_server(succeeding_work()).await;

    let (_, body) = request(port, "POST", "/api/tasks/").await;
    let first: Task = serde_json::from_str(&body).unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    let (_, body) = request(port, "POST", "/api/tasks/").await;
    let second: Task = serde_json::from_str(&body).unwrap();

    let (status, body) = request(port, "GET", "/api/tasks/?limit=1&offset=0").await;
    assert_eq!(status, 200);
    let page: Vec<Task> = serde_json::from_str(&body).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, second.id);

    // Garbage pagination falls back to limit=10 offset=0, never a 400.
    let (status, body) = request(port, "GET", "/api/tasks/?limit=abc&offset=-2").await;
    assert_eq!(status, 200);
    let page: Vec<Task> = serde_json::from_str(&body).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, second.id);
    assert_eq!(page[1].id, first.id);

    // Out-of-range offset: empty array.
    let (status, body) = request(port, "GET", "/api/tasks/?limit=10&offset=50").await;
    assert_eq!(status, 200);
    let page: Vec<Task> = serde_json::from_str(&body).unwrap();
    assert!(page.is_empty());
}

#[tokio::test]
async fn tasks_routes_work_with_and_without_trailing_slash() {
    let port = spawn_server(succeeding_work()).await;
    let (status, _) = request(port, "POST", "/api/tasks").await;
    assert_eq!(status, 201);
    let (status, _) = request(port, "GET", "/api/tasks").await;
    assert_eq!(status, 200);
    let (status, _) = request(port, "GET", "/api/tasks/").await;
    assert_eq!(status, 200);
}

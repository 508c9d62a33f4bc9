use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::value::RawValue;
use tracing::info;

use taskd::config::AppConfig;
use taskd::engine::{TaskEngine, WorkFn};
use taskd::rest;
use taskd::retry::{retry_with_backoff, RetryConfig};
use taskd::store::sqlite::SqliteTaskStore;
use taskd::AppContext;

#[derive(Parser)]
#[command(
    name = "taskd",
    about = "HTTP service for submitting long-running tasks and polling their lifecycle",
    version
)]
struct Args {
    /// HTTP API port
    #[arg(long, env = "TASKD_PORT")]
    port: Option<u16>,

    /// Data directory for the SQLite database
    #[arg(long, env = "TASKD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to config.toml
    #[arg(long, env = "TASKD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKD_LOG")]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TASKD_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON instead of the compact human format
    #[arg(long, env = "TASKD_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log.clone().unwrap_or_else(|| "info".to_string());
    let _log_guard = setup_logging(&log_level, args.log_file.as_deref(), args.log_json);

    let config = AppConfig::load(args.config.as_deref());
    let port = args.port.unwrap_or(config.server.port);
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("./data"));

    // Establish store connectivity before binding the server: bounded
    // attempts with a fixed backoff, fail hard if the store never comes up.
    let retry = RetryConfig::fixed(
        config.database.connect_attempts,
        Duration::from_millis(config.database.connect_backoff_ms),
    );
    let store = retry_with_backoff(&retry, || SqliteTaskStore::open(&data_dir))
        .await
        .context("failed to open task store")?;
    info!(data_dir = %data_dir.display(), "task store ready");

    let work = demo_work(Duration::from_secs(config.work.delay_secs));
    let engine = TaskEngine::new(Arc::new(store), work);
    let ctx = AppContext::new(engine);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, port)
        .parse()
        .context("invalid bind address")?;
    let grace = Duration::from_secs(config.server.shutdown_grace_secs);

    rest::serve(ctx, addr, grace).await?;
    info!("server exited");
    Ok(())
}

/// The reference work function: sleep for `delay`, then return a canned
/// success payload. Stands in for whatever real long-running computation an
/// embedding application injects.
fn demo_work(delay: Duration) -> WorkFn {
    Arc::new(move || {
        Box::pin(async move {
            info!("starting long-running work");
            tokio::time::sleep(delay).await;
            let payload = serde_json::json!({
                "message": "Task completed successfully",
                "timestamp": Utc::now().to_rfc3339(),
            });
            let raw: Box<RawValue> = serde_json::value::to_raw_value(&payload)?;
            info!("long-running work finished");
            Ok(raw)
        })
    })
}

/// Set up tracing with an env-filter level, compact or JSON format, and an
/// optional daily-rotated log file.
///
/// Returns the appender guard when file logging is active — dropping it
/// flushes buffered log lines, so main holds it for the process lifetime.
/// If the log directory cannot be created, falls back to stdout-only
/// logging with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    use_json: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("taskd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}

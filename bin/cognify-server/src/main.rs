//! cognify-server – entry point.
//!
//! Startup order:
//! 1. Load `.env.local`, parse CLI flags and build the configuration.
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Open the SQLite database and run pending migrations.
//! 4. Build the LLM client, tutor and code-execution client.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod entities;
mod error;
mod middleware;
mod routes;
mod schemas;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use cognify_llm::{ExecutionClient, LlmClient, Tutor};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use crate::config::{Cli, Config};
use crate::entities::SqliteStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    // A missing .env.local is normal; only real environment variables apply then.
    let dotenv = dotenvy::from_filename(".env.local");
    let cfg = Config::from_env().with_cli(Cli::parse());

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let _log_guard = init_tracing(&cfg);
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "failed to read .env.local");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "cognify-server starting");

    // ── 3. Database ────────────────────────────────────────────────────────────
    let store = SqliteStore::connect(&cfg.database_url).await?;
    info!(database_url = %cfg.database_url, "database ready");

    // ── 4. AI backends ─────────────────────────────────────────────────────────
    let llm = LlmClient::new(cfg.llm.clone())?;
    info!(
        completion_url = %cfg.llm.completion_url,
        stream_url = %cfg.llm.stream_url,
        model = %cfg.llm.model,
        "LLM client ready"
    );
    let executor = ExecutionClient::new(cfg.piston_url.clone())?;

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        store: Arc::new(store),
        tutor: Tutor::new(Arc::new(llm)),
        executor,
    });

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, swagger = cfg.enable_swagger, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("cognify-server stopped");
    Ok(())
}

/// Install the global subscriber.  The returned guard flushes the log file
/// on drop, so it must live until `main` returns.
fn init_tracing(cfg: &Config) -> Option<WorkerGuard> {
    // Build the log-level filter, warning loudly if the configured value is
    // not a valid tracing filter expression.
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: COGNIFY_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let (writer, guard) = match &cfg.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cognify-server.log");
            let (file, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(std::io::stdout.and(file)), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    guard
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}

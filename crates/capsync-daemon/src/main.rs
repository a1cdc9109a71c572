//! capsync-daemon entry point.
//!
//! Thin: sets up tracing and metrics, builds the pipeline, spawns the
//! offering sync worker, wires middleware and serves HTTP. Handlers live in
//! `routes.rs`; shared state in `state.rs`.

use std::sync::Arc;

use anyhow::Context;
use capsync_config::ServiceProfile;
use capsync_daemon::{bootstrap, metrics, routes, state};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let prometheus = metrics::install_prometheus_recorder()?;

    let paths = bootstrap::config_paths_from_env();
    let (_loaded, settings) = bootstrap::load_settings(ServiceProfile::CapacityIngress, &paths)?;
    let daemon = settings
        .daemon
        .clone()
        .context("capacity-ingress profile requires daemon settings")?;

    let pipeline = bootstrap::build_pipeline(&settings).await?;
    let (sync_tx, worker) =
        state::spawn_offering_worker(Arc::clone(&pipeline.controller), daemon.sync_queue_capacity);

    let shared = Arc::new(
        state::AppState::new(
            Arc::clone(&pipeline.registry),
            Arc::clone(&pipeline.reconciler),
            sync_tx,
        )
        .with_metrics(prometheus),
    );

    let app = routes::build_router(Arc::clone(&shared)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    info!("capsync-daemon listening on http://{}", daemon.bind_addr);

    axum::serve(tokio::net::TcpListener::bind(daemon.bind_addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    // Router (and its sender clone) is gone; dropping the last sender lets
    // the worker drain and exit.
    drop(shared);
    worker.await.context("offering sync worker panicked")?;
    pipeline.pool.close().await;
    info!("capsync-daemon stopped");

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

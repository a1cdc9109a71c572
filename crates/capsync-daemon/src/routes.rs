//! Axum router and HTTP handlers for capsync-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Tests compose the bare router directly.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, info, warn};

use capsync_schemas::OfferingSyncTask;

use crate::{
    api_types::{ErrorResponse, HealthResponse, SyncQueuedResponse, VariantSummary},
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/v1/offerings/:sku/sync", post(offering_sync))
        .route(
            "/v1/subscriptions/:id/capacity/reconcile",
            post(subscription_reconcile),
        )
        .route("/v1/registry/variants/:tag", get(registry_variant))
        .with_state(state)
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(msg))).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            uptime_secs: uptime_secs(),
            definitions: st.registry.len(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /metrics
// ---------------------------------------------------------------------------

pub(crate) async fn metrics_handler(State(st): State<Arc<AppState>>) -> Response {
    match &st.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        ),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/offerings/:sku/sync
// ---------------------------------------------------------------------------

/// Enqueue a sync; the worker does the fetch. 503 when the queue is full or
/// the worker has stopped.
pub(crate) async fn offering_sync(
    State(st): State<Arc<AppState>>,
    Path(sku): Path<String>,
) -> Response {
    let sku = sku.trim().to_string();
    if sku.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "sku must not be empty");
    }

    match st.sync_tx.try_send(OfferingSyncTask::new(sku.clone())) {
        Ok(()) => {
            info!(sku = %sku, "offering sync queued");
            (
                StatusCode::ACCEPTED,
                Json(SyncQueuedResponse { sku, queued: true }),
            )
                .into_response()
        }
        Err(TrySendError::Full(_)) => {
            warn!(sku = %sku, "offering sync queue full");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "offering sync queue is full")
        }
        Err(TrySendError::Closed(_)) => {
            error!(sku = %sku, "offering sync worker is not running");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "offering sync worker is not running",
            )
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/subscriptions/:id/capacity/reconcile
// ---------------------------------------------------------------------------

pub(crate) async fn subscription_reconcile(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match st.reconciler.reconcile_capacity_for_subscription_id(&id).await {
        Ok(Some(outcome)) => (StatusCode::OK, Json(outcome)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("subscription '{id}' not found"),
        ),
        Err(err) => {
            error!(subscription_id = %id, error = %format!("{err:#}"), "reconcile failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/registry/variants/:tag
// ---------------------------------------------------------------------------

pub(crate) async fn registry_variant(
    State(st): State<Arc<AppState>>,
    Path(tag): Path<String>,
) -> Response {
    match st.registry.lookup_by_tag(&tag) {
        Some(def) => (StatusCode::OK, Json(VariantSummary::new(&tag, def))).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("variant '{tag}' not found")),
    }
}

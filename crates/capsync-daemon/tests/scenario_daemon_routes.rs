//! In-process scenario tests for capsync-daemon HTTP endpoints.
//!
//! The router is built over in-memory stores and driven via
//! `tower::ServiceExt::oneshot`; no socket is bound and no database is used.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::mpsc;
use tower::ServiceExt; // oneshot

use capsync_daemon::{routes, state::AppState};
use capsync_reconcile::ProductAllowlist;
use capsync_schemas::{Offering, OfferingSyncTask};
use capsync_testkit::{subscription, CapacityHarness};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    harness: CapacityHarness,
    state: AppState,
    rx: mpsc::Receiver<OfferingSyncTask>,
}

fn fixture(queue: usize) -> Fixture {
    let harness = CapacityHarness::new(ProductAllowlist::allow_all()).unwrap();
    let (tx, rx) = mpsc::channel(queue);
    let state = AppState::new(
        Arc::clone(&harness.registry),
        Arc::clone(&harness.reconciler),
        tx,
    );
    Fixture { harness, state, rx }
}

fn router(state: &AppState) -> axum::Router {
    routes::build_router(Arc::new(state.clone()))
}

async fn call(router: axum::Router, method: &str, uri: &str) -> (StatusCode, bytes::Bytes) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_loaded_definitions() {
    let f = fixture(4);
    let (status, body) = call(router(&f.state), "GET", "/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "capsync-daemon");
    assert_eq!(json["definitions"], 3);
}

// ---------------------------------------------------------------------------
// GET /metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_is_unavailable_without_recorder() {
    let f = fixture(4);
    let (status, _) = call(router(&f.state), "GET", "/metrics").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_renders_with_recorder_handle() {
    let f = fixture(4);
    // Not installed globally: only the handle is needed for rendering.
    let recorder = PrometheusBuilder::new().build_recorder();
    let state = f.state.clone().with_metrics(recorder.handle());

    let (status, _) = call(router(&state), "GET", "/metrics").await;
    assert_eq!(status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// POST /v1/offerings/:sku/sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn offering_sync_enqueues_task_and_returns_202() {
    let mut f = fixture(4);
    let (status, body) = call(router(&f.state), "POST", "/v1/offerings/MCT0001/sync").await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(parse_json(body)["sku"], "MCT0001");
    assert_eq!(f.rx.try_recv().unwrap(), OfferingSyncTask::new("MCT0001"));
}

#[tokio::test]
async fn offering_sync_returns_503_when_queue_full() {
    let f = fixture(1);
    let (first, _) = call(router(&f.state), "POST", "/v1/offerings/A/sync").await;
    let (second, body) = call(router(&f.state), "POST", "/v1/offerings/B/sync").await;

    assert_eq!(first, StatusCode::ACCEPTED);
    assert_eq!(second, StatusCode::SERVICE_UNAVAILABLE);
    assert!(parse_json(body)["error"]
        .as_str()
        .unwrap()
        .contains("full"));
}

#[tokio::test]
async fn offering_sync_returns_503_when_worker_gone() {
    let f = fixture(4);
    let Fixture { state, rx, .. } = f;
    drop(rx);

    let (status, _) = call(router(&state), "POST", "/v1/offerings/MCT0001/sync").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ---------------------------------------------------------------------------
// POST /v1/subscriptions/:id/capacity/reconcile
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconcile_known_subscription_returns_outcome() {
    let f = fixture(4);
    f.harness
        .offerings
        .insert(Offering::new("MCT0001").with_product_ids([479, 71]));
    f.harness
        .subscriptions
        .insert(subscription("S1", "MCT0001", 1));

    let (status, body) = call(
        router(&f.state),
        "POST",
        "/v1/subscriptions/S1/capacity/reconcile",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["subscription_id"], "S1");
    assert_eq!(json["created"], 2);
    assert_eq!(json["deleted"], 0);
    assert_eq!(f.harness.capacity.all().len(), 2);
}

#[tokio::test]
async fn reconcile_unknown_subscription_returns_404() {
    let f = fixture(4);
    let (status, _) = call(
        router(&f.state),
        "POST",
        "/v1/subscriptions/nope/capacity/reconcile",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// GET /v1/registry/variants/:tag
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registry_variant_summary() {
    let f = fixture(4);
    let (status, body) = call(router(&f.state), "GET", "/v1/registry/variants/rosa").await;

    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["definition_id"], "rosa");
    assert_eq!(json["contract_enabled"], true);
    assert_eq!(json["payg_eligible"], true);
    assert_eq!(json["granularities"][0], "HOURLY");
}

#[tokio::test]
async fn registry_variant_with_encoded_space_resolves() {
    let f = fixture(4);
    let (status, body) = call(
        router(&f.state),
        "GET",
        "/v1/registry/variants/RHEL%20for%20x86",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["definition_id"], "rhel-for-x86");
    assert_eq!(json["granularities"][0], "DAILY");
}

#[tokio::test]
async fn registry_unknown_variant_returns_404() {
    let f = fixture(4);
    let (status, _) = call(router(&f.state), "GET", "/v1/registry/variants/Satellite%20Capsule").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//! Shared runtime state for capsync-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Everything here is
//! either immutable after startup or internally synchronized.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use capsync_offering::{OfferingSyncController, OfferingWorker};
use capsync_reconcile::CapacityReconciler;
use capsync_registry::SubscriptionDefinitionRegistry;
use capsync_schemas::OfferingSyncTask;

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub registry: Arc<SubscriptionDefinitionRegistry>,
    pub reconciler: Arc<CapacityReconciler>,
    /// Producer side of the offering sync queue.
    pub sync_tx: mpsc::Sender<OfferingSyncTask>,
    /// `None` until a Prometheus recorder is installed; `/metrics` then 503s.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        registry: Arc<SubscriptionDefinitionRegistry>,
        reconciler: Arc<CapacityReconciler>,
        sync_tx: mpsc::Sender<OfferingSyncTask>,
    ) -> Self {
        Self {
            build: BuildInfo {
                service: "capsync-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            registry,
            reconciler,
            sync_tx,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Create the sync queue and spawn its single consumer.
///
/// The worker exits once every clone of the returned sender is dropped.
pub fn spawn_offering_worker(
    controller: Arc<OfferingSyncController>,
    capacity: usize,
) -> (mpsc::Sender<OfferingSyncTask>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let worker = OfferingWorker::new(controller, rx);
    (tx, tokio::spawn(worker.run()))
}

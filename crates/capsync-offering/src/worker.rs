use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use metrics::histogram;
use tokio::sync::mpsc;
use tracing::{error, info};

use capsync_schemas::OfferingSyncTask;

use crate::controller::{OfferingSyncController, SyncResult};

pub const OFFERING_SYNC_HISTOGRAM: &str = "capsync_offering_sync_seconds";

/// Drains sync tasks one at a time.
///
/// Delivery is at-least-once and syncing is idempotent, so a failed task is
/// logged and dropped rather than retried here.
pub struct OfferingWorker {
    controller: Arc<OfferingSyncController>,
    rx: mpsc::Receiver<OfferingSyncTask>,
}

impl OfferingWorker {
    pub fn new(controller: Arc<OfferingSyncController>, rx: mpsc::Receiver<OfferingSyncTask>) -> Self {
        Self { controller, rx }
    }

    /// Returns once every sender has been dropped and the queue is empty.
    pub async fn run(mut self) {
        info!("offering sync worker started");
        while let Some(task) = self.rx.recv().await {
            // Errors are already logged by `handle`.
            let _ = self.handle(task).await;
        }
        info!("offering sync queue closed; worker stopped");
    }

    pub async fn handle(&self, task: OfferingSyncTask) -> Result<SyncResult> {
        let sku = task.sku;
        info!(sku = %sku, "offering sync triggered");
        let started = Instant::now();

        let result = self.controller.sync_sku(&sku).await;

        let elapsed = started.elapsed();
        histogram!(OFFERING_SYNC_HISTOGRAM).record(elapsed.as_secs_f64());
        let elapsed_ms = elapsed.as_millis() as u64;

        match &result {
            Ok(outcome) => info!(sku = %sku, %outcome, elapsed_ms, "offering sync finished"),
            Err(err) => error!(sku = %sku, elapsed_ms, error = %format!("{err:#}"), "offering sync failed"),
        }
        result
    }
}

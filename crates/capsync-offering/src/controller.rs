use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use capsync_reconcile::{CapacityReconciler, OfferingStore};
use capsync_schemas::Offering;

use crate::provider::UpstreamOfferingProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncResult {
    /// Upstream matches what is stored; nothing written.
    Unchanged,
    /// Offering stored and `reconciled` subscriptions re-reconciled.
    Fetched { reconciled: usize },
    /// Upstream has no such SKU; nothing written.
    Skipped,
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncResult::Unchanged => f.write_str("unchanged"),
            SyncResult::Fetched { reconciled } => write!(f, "fetched (reconciled={reconciled})"),
            SyncResult::Skipped => f.write_str("skipped"),
        }
    }
}

pub struct OfferingSyncController {
    upstream: Arc<dyn UpstreamOfferingProvider>,
    offerings: Arc<dyn OfferingStore>,
    reconciler: Arc<CapacityReconciler>,
}

impl OfferingSyncController {
    pub fn new(
        upstream: Arc<dyn UpstreamOfferingProvider>,
        offerings: Arc<dyn OfferingStore>,
        reconciler: Arc<CapacityReconciler>,
    ) -> Self {
        Self {
            upstream,
            offerings,
            reconciler,
        }
    }

    pub async fn get_upstream_offering(&self, sku: &str) -> Result<Option<Offering>> {
        self.upstream.fetch_offering(sku).await
    }

    /// Store `offering` if it differs from the stored copy, then reconcile
    /// every subscription of its SKU.
    pub async fn sync_offering(&self, offering: Offering) -> Result<SyncResult> {
        let stored = self
            .offerings
            .find_offering(&offering.sku)
            .await
            .with_context(|| format!("load stored offering {} failed", offering.sku))?;

        if stored.as_ref() == Some(&offering) {
            info!(sku = %offering.sku, "offering unchanged; skipping sync");
            return Ok(SyncResult::Unchanged);
        }

        self.offerings
            .save_offering(&offering)
            .await
            .with_context(|| format!("save offering {} failed", offering.sku))?;

        let outcomes = self
            .reconciler
            .reconcile_capacity_for_offering(&offering.sku)
            .await?;

        Ok(SyncResult::Fetched {
            reconciled: outcomes.len(),
        })
    }

    /// Fetch `sku` upstream and sync it.
    pub async fn sync_sku(&self, sku: &str) -> Result<SyncResult> {
        match self.get_upstream_offering(sku).await? {
            Some(offering) => self.sync_offering(offering).await,
            None => {
                warn!(sku, "offering not found in upstream catalog");
                Ok(SyncResult::Skipped)
            }
        }
    }
}

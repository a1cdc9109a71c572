use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, warn};

use capsync_schemas::{CapacityRecord, Subscription};

use crate::extractor::CapacityProductExtractor;
use crate::gate::EligibilityGate;
use crate::locks::SubscriptionLocks;
use crate::plan::plan_capacity;
use crate::store::{CapacityStore, OfferingStore, SubscriptionStore};

pub const CAPACITY_CREATED_COUNTER: &str = "capsync_capacity_records_created_total";
pub const CAPACITY_UPDATED_COUNTER: &str = "capsync_capacity_records_updated_total";
pub const CAPACITY_DELETED_COUNTER: &str = "capsync_capacity_records_deleted_total";

/// Counts from one reconcile of one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub subscription_id: String,
    pub sku: String,
    pub eligible: bool,
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
}

/// Converges persisted capacity onto what each subscription entitles.
///
/// Holds no mutable state of its own; same-id calls are serialized through
/// [`SubscriptionLocks`].
pub struct CapacityReconciler {
    offerings: Arc<dyn OfferingStore>,
    capacity: Arc<dyn CapacityStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    extractor: CapacityProductExtractor,
    gate: Arc<dyn EligibilityGate>,
    locks: SubscriptionLocks,
}

impl CapacityReconciler {
    pub fn new(
        offerings: Arc<dyn OfferingStore>,
        capacity: Arc<dyn CapacityStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        extractor: CapacityProductExtractor,
        gate: Arc<dyn EligibilityGate>,
    ) -> Self {
        Self {
            offerings,
            capacity,
            subscriptions,
            extractor,
            gate,
            locks: SubscriptionLocks::new(),
        }
    }

    /// Derive, diff and persist capacity for `subscription`.
    ///
    /// Upserts and deletes are two separate batches. A failure between them
    /// leaves stale records behind; re-running converges.
    pub async fn reconcile_capacity_for_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<ReconcileOutcome> {
        let _guard = self.locks.lock(&subscription.subscription_id).await;

        let desired = self.desired_capacity(subscription).await?;
        let existing = self
            .capacity
            .find_by_subscription_id(&subscription.subscription_id)
            .await
            .with_context(|| {
                format!(
                    "load capacity failed for subscription {}",
                    subscription.subscription_id
                )
            })?;

        let eligible = self.gate.is_eligible(&subscription.sku);
        let plan = plan_capacity(desired, existing, eligible);

        if !plan.to_save.is_empty() {
            self.capacity
                .save_all(&plan.to_save)
                .await
                .context("save capacity batch failed")?;
        }
        if !plan.to_delete.is_empty() {
            self.capacity
                .delete_all(&plan.to_delete)
                .await
                .context("delete capacity batch failed")?;
            info!(
                subscription_id = %subscription.subscription_id,
                removed = plan.to_delete.len(),
                "removed capacity records no longer entitled"
            );
        }

        counter!(CAPACITY_CREATED_COUNTER).increment(plan.created);
        counter!(CAPACITY_UPDATED_COUNTER).increment(plan.updated);
        counter!(CAPACITY_DELETED_COUNTER).increment(plan.deleted());

        let outcome = ReconcileOutcome {
            subscription_id: subscription.subscription_id.clone(),
            sku: subscription.sku.clone(),
            eligible,
            created: plan.created,
            updated: plan.updated,
            deleted: plan.deleted(),
        };
        debug!(?outcome, "capacity reconciled");
        Ok(outcome)
    }

    /// `Ok(None)` when the subscription does not exist.
    pub async fn reconcile_capacity_for_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ReconcileOutcome>> {
        let found = self
            .subscriptions
            .find_subscription(subscription_id)
            .await
            .with_context(|| format!("load subscription {subscription_id} failed"))?;

        match found {
            Some(sub) => self.reconcile_capacity_for_subscription(&sub).await.map(Some),
            None => {
                warn!(subscription_id, "reconcile requested for unknown subscription");
                Ok(None)
            }
        }
    }

    /// Reconcile every subscription of `sku`, in store order. Stops at the
    /// first failure.
    pub async fn reconcile_capacity_for_offering(&self, sku: &str) -> Result<Vec<ReconcileOutcome>> {
        let subs = self
            .subscriptions
            .find_subscriptions_by_sku(sku)
            .await
            .with_context(|| format!("load subscriptions for sku {sku} failed"))?;

        let mut outcomes = Vec::with_capacity(subs.len());
        for sub in &subs {
            outcomes.push(self.reconcile_capacity_for_subscription(sub).await?);
        }
        Ok(outcomes)
    }

    async fn desired_capacity(&self, subscription: &Subscription) -> Result<Vec<CapacityRecord>> {
        let offering = self
            .offerings
            .find_offering(&subscription.sku)
            .await
            .with_context(|| format!("load offering {} failed", subscription.sku))?;

        let Some(offering) = offering else {
            warn!(
                subscription_id = %subscription.subscription_id,
                sku = %subscription.sku,
                "offering not found; subscription entitles no capacity"
            );
            return Ok(Vec::new());
        };

        let desired = self
            .extractor
            .products_for(&offering)
            .into_iter()
            .map(|product| CapacityRecord::from_subscription(subscription, &offering, product))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(desired)
    }
}

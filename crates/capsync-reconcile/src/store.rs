//! Persistence seams the engine depends on.
//!
//! Postgres implementations live in `capsync-db`; in-memory ones in
//! `capsync-testkit`.

use anyhow::Result;
use async_trait::async_trait;

use capsync_schemas::{CapacityRecord, Offering, Subscription};

#[async_trait]
pub trait OfferingStore: Send + Sync {
    async fn find_offering(&self, sku: &str) -> Result<Option<Offering>>;

    /// Insert or replace the offering keyed by its SKU.
    async fn save_offering(&self, offering: &Offering) -> Result<()>;
}

#[async_trait]
pub trait CapacityStore: Send + Sync {
    async fn find_by_subscription_id(&self, subscription_id: &str) -> Result<Vec<CapacityRecord>>;

    /// Upsert by [`CapacityKey`](capsync_schemas::CapacityKey). Must leave at
    /// most one record per key.
    async fn save_all(&self, records: &[CapacityRecord]) -> Result<()>;

    async fn delete_all(&self, records: &[CapacityRecord]) -> Result<()>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>>;

    async fn find_subscriptions_by_sku(&self, sku: &str) -> Result<Vec<Subscription>>;
}

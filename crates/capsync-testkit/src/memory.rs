use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Result};
use async_trait::async_trait;

use capsync_offering::UpstreamOfferingProvider;
use capsync_reconcile::{CapacityStore, OfferingStore, SubscriptionStore};
use capsync_schemas::{CapacityKey, CapacityRecord, Offering, Subscription};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

// ---------------------------------------------------------------------------
// Offerings
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryOfferingStore {
    rows: Mutex<BTreeMap<String, Offering>>,
    saves: AtomicUsize,
}

impl InMemoryOfferingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed without counting as a save.
    pub fn insert(&self, offering: Offering) {
        lock(&self.rows).insert(offering.sku.clone(), offering);
    }

    pub fn get(&self, sku: &str) -> Option<Offering> {
        lock(&self.rows).get(sku).cloned()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OfferingStore for InMemoryOfferingStore {
    async fn find_offering(&self, sku: &str) -> Result<Option<Offering>> {
        Ok(self.get(sku))
    }

    async fn save_offering(&self, offering: &Offering) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.insert(offering.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    rows: Mutex<BTreeMap<String, Subscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, sub: Subscription) {
        lock(&self.rows).insert(sub.subscription_id.clone(), sub);
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn find_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        Ok(lock(&self.rows).get(subscription_id).cloned())
    }

    async fn find_subscriptions_by_sku(&self, sku: &str) -> Result<Vec<Subscription>> {
        Ok(lock(&self.rows)
            .values()
            .filter(|s| s.sku == sku)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// Keyed by [`CapacityKey`], so duplicate keys are impossible by
/// construction, matching the table's primary key.
#[derive(Debug, Default)]
pub struct InMemoryCapacityStore {
    rows: Mutex<BTreeMap<CapacityKey, CapacityRecord>>,
    save_batches: AtomicUsize,
    delete_batches: AtomicUsize,
    fail_deletes: AtomicBool,
}

impl InMemoryCapacityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, records: impl IntoIterator<Item = CapacityRecord>) {
        let mut rows = lock(&self.rows);
        for r in records {
            rows.insert(r.key.clone(), r);
        }
    }

    /// All rows in key order.
    pub fn all(&self) -> Vec<CapacityRecord> {
        lock(&self.rows).values().cloned().collect()
    }

    pub fn product_ids(&self, subscription_id: &str) -> Vec<String> {
        lock(&self.rows)
            .keys()
            .filter(|k| k.subscription_id == subscription_id)
            .map(|k| k.product_id.clone())
            .collect()
    }

    pub fn save_batches(&self) -> usize {
        self.save_batches.load(Ordering::SeqCst)
    }

    pub fn delete_batches(&self) -> usize {
        self.delete_batches.load(Ordering::SeqCst)
    }

    /// Make subsequent `delete_all` calls fail, simulating a crash between
    /// the upsert and delete batches.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CapacityStore for InMemoryCapacityStore {
    async fn find_by_subscription_id(&self, subscription_id: &str) -> Result<Vec<CapacityRecord>> {
        Ok(lock(&self.rows)
            .values()
            .filter(|r| r.key.subscription_id == subscription_id)
            .cloned()
            .collect())
    }

    async fn save_all(&self, records: &[CapacityRecord]) -> Result<()> {
        self.save_batches.fetch_add(1, Ordering::SeqCst);
        self.insert(records.iter().cloned());
        Ok(())
    }

    async fn delete_all(&self, records: &[CapacityRecord]) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            bail!("injected delete failure");
        }
        self.delete_batches.fetch_add(1, Ordering::SeqCst);
        let mut rows = lock(&self.rows);
        for r in records {
            rows.remove(&r.key);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Upstream catalog
// ---------------------------------------------------------------------------

/// Upstream catalog backed by a map. Unknown SKUs are "not found".
#[derive(Debug, Default)]
pub struct StaticUpstream {
    offerings: Mutex<BTreeMap<String, Offering>>,
    fetches: AtomicUsize,
    fail: AtomicBool,
}

impl StaticUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, offering: Offering) {
        lock(&self.offerings).insert(offering.sku.clone(), offering);
    }

    pub fn withdraw(&self, sku: &str) {
        lock(&self.offerings).remove(sku);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UpstreamOfferingProvider for StaticUpstream {
    async fn fetch_offering(&self, sku: &str) -> Result<Option<Offering>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("upstream catalog unavailable");
        }
        Ok(lock(&self.offerings).get(sku).cloned())
    }
}

//! capsync-schemas
//!
//! Shared data model for the capacity pipeline. Subscriptions and offerings
//! are owned by external stores and are read-only to the reconciliation core;
//! capacity records are derived from them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub subscription_id: String,
    pub subscription_number: Option<String>,
    /// Offering reference.
    pub sku: String,
    pub org_id: String,
    pub account_number: Option<String>,
    pub quantity: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub billing_provider: Option<String>,
}

impl Subscription {
    pub fn new(
        subscription_id: impl Into<String>,
        sku: impl Into<String>,
        org_id: impl Into<String>,
        quantity: i64,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            subscription_number: None,
            sku: sku.into(),
            org_id: org_id.into(),
            account_number: None,
            quantity,
            start_date,
            end_date: None,
            billing_provider: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Offering
// ---------------------------------------------------------------------------

/// Commercial and product metadata for a purchasable SKU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Offering {
    pub sku: String,
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub product_family: Option<String>,
    pub role: Option<String>,
    /// Engineering product ids entitled by this SKU.
    pub product_ids: BTreeSet<i32>,
    pub child_skus: BTreeSet<String>,
    pub service_level: Option<String>,
    pub usage: Option<String>,
    pub cores: Option<i32>,
    pub sockets: Option<i32>,
    pub hypervisor_cores: Option<i32>,
    pub hypervisor_sockets: Option<i32>,
    pub has_unlimited_usage: Option<bool>,
    pub derived_sku: Option<String>,
}

impl Offering {
    pub fn new(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            ..Self::default()
        }
    }

    pub fn with_product_ids(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.product_ids = ids.into_iter().collect();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// Natural key of a capacity record. At most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CapacityKey {
    pub org_id: String,
    pub subscription_id: String,
    pub product_id: String,
}

/// A per-unit count times the subscription quantity does not fit in `i64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityOverflow {
    pub subscription_id: String,
    pub quantity: i64,
    pub per_unit: i32,
}

impl fmt::Display for CapacityOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity overflow for subscription {}: {} per unit x quantity {}",
            self.subscription_id, self.per_unit, self.quantity
        )
    }
}

impl std::error::Error for CapacityOverflow {}

/// Entitled quantity of one product under one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub key: CapacityKey,
    pub sku: String,
    pub begin_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub account_number: Option<String>,
    pub service_level: Option<String>,
    pub usage: Option<String>,
    pub has_unlimited_usage: Option<bool>,
    pub physical_sockets: Option<i64>,
    pub virtual_sockets: Option<i64>,
    pub physical_cores: Option<i64>,
    pub virtual_cores: Option<i64>,
}

impl CapacityRecord {
    /// Derive the capacity record implied by `subscription` for `product_id`.
    ///
    /// Per-unit counts on the offering are multiplied by the subscription
    /// quantity; absent counts stay absent. A count that overflows `i64` is
    /// an error, never a wrapped value.
    pub fn from_subscription(
        subscription: &Subscription,
        offering: &Offering,
        product_id: impl Into<String>,
    ) -> Result<Self, CapacityOverflow> {
        let scale = |per_unit: Option<i32>| -> Result<Option<i64>, CapacityOverflow> {
            per_unit
                .map(|n| {
                    i64::from(n)
                        .checked_mul(subscription.quantity)
                        .ok_or_else(|| CapacityOverflow {
                            subscription_id: subscription.subscription_id.clone(),
                            quantity: subscription.quantity,
                            per_unit: n,
                        })
                })
                .transpose()
        };

        Ok(Self {
            key: CapacityKey {
                org_id: subscription.org_id.clone(),
                subscription_id: subscription.subscription_id.clone(),
                product_id: product_id.into(),
            },
            sku: subscription.sku.clone(),
            begin_date: subscription.start_date,
            end_date: subscription.end_date,
            account_number: subscription.account_number.clone(),
            service_level: offering.service_level.clone(),
            usage: offering.usage.clone(),
            has_unlimited_usage: offering.has_unlimited_usage,
            physical_sockets: scale(offering.sockets)?,
            virtual_sockets: scale(offering.hypervisor_sockets)?,
            physical_cores: scale(offering.cores)?,
            virtual_cores: scale(offering.hypervisor_cores)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Sync task
// ---------------------------------------------------------------------------

/// Inbound request to refresh one offering from the upstream catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingSyncTask {
    pub sku: String,
}

impl OfferingSyncTask {
    pub fn new(sku: impl Into<String>) -> Self {
        Self { sku: sku.into() }
    }
}

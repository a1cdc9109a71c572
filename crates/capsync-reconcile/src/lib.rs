//! capsync-reconcile
//!
//! Capacity reconciliation: given a subscription, derive the capacity records
//! it entitles and converge persisted capacity onto that set.
//!
//! - [`plan_capacity`] is the deterministic diff (no IO).
//! - [`CapacityReconciler`] resolves collaborators, applies the plan and
//!   records counters.
//! - [`CapacityProductExtractor`] maps an offering onto variant tags.
//! - [`EligibilityGate`] decides whether a SKU may hold capacity at all.

mod engine;
mod extractor;
mod gate;
mod locks;
mod plan;
mod store;

pub use engine::{
    CapacityReconciler, ReconcileOutcome, CAPACITY_CREATED_COUNTER, CAPACITY_DELETED_COUNTER,
    CAPACITY_UPDATED_COUNTER,
};
pub use extractor::CapacityProductExtractor;
pub use gate::{EligibilityGate, ProductAllowlist};
pub use locks::SubscriptionLocks;
pub use plan::{plan_capacity, CapacityPlan};
pub use store::{CapacityStore, OfferingStore, SubscriptionStore};

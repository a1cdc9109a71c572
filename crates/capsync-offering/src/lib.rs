//! capsync-offering
//!
//! Keeps locally stored offerings in step with the upstream product catalog
//! and re-reconciles capacity for every subscription an offering change
//! touches.
//!
//! - [`UpstreamOfferingProvider`] / [`HttpOfferingProvider`]: catalog fetch.
//! - [`OfferingSyncController`]: compare, persist, reconcile.
//! - [`OfferingWorker`]: drains [`OfferingSyncTask`](capsync_schemas::OfferingSyncTask)
//!   messages one at a time.

mod controller;
mod provider;
mod worker;

pub use controller::{OfferingSyncController, SyncResult};
pub use provider::{HttpOfferingProvider, ProviderError, UpstreamOfferingProvider};
pub use worker::{OfferingWorker, OFFERING_SYNC_HISTOGRAM};

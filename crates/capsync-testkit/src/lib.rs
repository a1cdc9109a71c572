//! capsync-testkit
//!
//! In-memory collaborators and fixtures for exercising the capacity pipeline
//! end to end without Postgres or a live catalog. Scenario tests under
//! `tests/` wire these into the real engine, controller and worker.

mod fixtures;
mod memory;

pub use fixtures::{sample_registry, subscription, t0, CapacityHarness, SAMPLE_DEFINITIONS};
pub use memory::{
    InMemoryCapacityStore, InMemoryOfferingStore, InMemorySubscriptionStore, StaticUpstream,
};

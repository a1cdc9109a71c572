//! capsync-daemon library target.
//!
//! Exposes the router, state and startup wiring for integration tests and
//! for `capsync-cli`, which reuses [`bootstrap`] to build the same pipeline.

pub mod api_types;
pub mod bootstrap;
pub mod metrics;
pub mod routes;
pub mod state;

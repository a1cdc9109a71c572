//! capsync-registry
//!
//! Declarative catalog of subscription definitions, loaded once from YAML and
//! queried read-only by the reconciliation pipeline.
//!
//! Typical startup:
//!
//! ```ignore
//! let reg = SubscriptionDefinitionRegistry::from_dir("config/subscription_configs")?;
//! let reg = capsync_registry::install_global(reg)?;
//! ```

mod definition;
mod registry;

pub use definition::{Defaults, Granularity, Metric, PrometheusQuery, SubscriptionDefinition, Variant};
pub use registry::{global, install_global, RegistryError, SubscriptionDefinitionRegistry};

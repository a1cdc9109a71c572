use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};

use capsync_offering::OfferingSyncController;
use capsync_reconcile::{CapacityProductExtractor, CapacityReconciler, EligibilityGate};
use capsync_registry::SubscriptionDefinitionRegistry;
use capsync_schemas::Subscription;

use crate::memory::{
    InMemoryCapacityStore, InMemoryOfferingStore, InMemorySubscriptionStore, StaticUpstream,
};

/// Small catalog covering the lookup shapes the engine relies on:
/// several variants per definition, role-only variants, and a
/// streaming-telemetry definition.
pub const SAMPLE_DEFINITIONS: &[(&str, &str)] = &[
    (
        "rhel/rhel-for-x86.yaml",
        r#"
platform: RHEL
id: rhel-for-x86
serviceType: RHEL System
metrics:
  - id: Sockets
variants:
  - tag: RHEL for x86
    engineeringIds: [479]
    roles: [Red Hat Enterprise Linux Server]
  - tag: RHEL Workstation
    engineeringIds: [71]
"#,
    ),
    (
        "satellite/satellite.yaml",
        r#"
platform: Satellite
id: satellite
metrics:
  - id: Sockets
variants:
  - tag: Satellite Server
    engineeringIds: [250]
    roles: [Satellite Server]
"#,
    ),
    (
        "openshift/rosa.yaml",
        r#"
platform: OpenShift
id: rosa
serviceType: rosa Instance
contractEnabled: true
metrics:
  - id: Cores
    awsDimension: four_vcpu_hour
    prometheus:
      queryKey: default
variants:
  - tag: rosa
    engineeringIds: [290]
"#,
    ),
];

pub fn sample_registry() -> Result<SubscriptionDefinitionRegistry> {
    Ok(SubscriptionDefinitionRegistry::from_yaml_strs(
        SAMPLE_DEFINITIONS.iter().copied(),
    )?)
}

/// Fixed start date used by every fixture subscription.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn subscription(id: &str, sku: &str, quantity: i64) -> Subscription {
    Subscription::new(id, sku, "org1", quantity, t0())
}

/// In-memory stores wired to the real engine and sync controller.
pub struct CapacityHarness {
    pub offerings: Arc<InMemoryOfferingStore>,
    pub capacity: Arc<InMemoryCapacityStore>,
    pub subscriptions: Arc<InMemorySubscriptionStore>,
    pub upstream: Arc<StaticUpstream>,
    pub registry: Arc<SubscriptionDefinitionRegistry>,
    pub reconciler: Arc<CapacityReconciler>,
    pub controller: Arc<OfferingSyncController>,
}

impl CapacityHarness {
    pub fn new(gate: impl EligibilityGate + 'static) -> Result<Self> {
        let offerings = Arc::new(InMemoryOfferingStore::new());
        let capacity = Arc::new(InMemoryCapacityStore::new());
        let subscriptions = Arc::new(InMemorySubscriptionStore::new());
        let upstream = Arc::new(StaticUpstream::new());
        let registry = Arc::new(sample_registry()?);

        let reconciler = Arc::new(CapacityReconciler::new(
            offerings.clone(),
            capacity.clone(),
            subscriptions.clone(),
            CapacityProductExtractor::new(Arc::clone(&registry)),
            Arc::new(gate),
        ));
        let controller = Arc::new(OfferingSyncController::new(
            upstream.clone(),
            offerings.clone(),
            Arc::clone(&reconciler),
        ));

        Ok(Self {
            offerings,
            capacity,
            subscriptions,
            upstream,
            registry,
            reconciler,
            controller,
        })
    }

    /// A second engine over the same stores, e.g. after the allow-list changed.
    pub fn reconciler_with_gate(&self, gate: impl EligibilityGate + 'static) -> CapacityReconciler {
        CapacityReconciler::new(
            self.offerings.clone(),
            self.capacity.clone(),
            self.subscriptions.clone(),
            CapacityProductExtractor::new(Arc::clone(&self.registry)),
            Arc::new(gate),
        )
    }
}

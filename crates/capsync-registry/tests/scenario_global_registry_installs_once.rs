//! Scenario: process-wide registry handle
//!
//! # Invariants under test
//!
//! 1. `global()` is empty until `install_global` runs.
//! 2. The installed handle and `global()` point at the same registry.
//! 3. A second install is refused and leaves the first in place.
//!
//! Kept in its own test binary: the handle is process state.

use std::sync::Arc;

use capsync_registry::{global, install_global, RegistryError, SubscriptionDefinitionRegistry};

const ROSA: &str = r#"
platform: OpenShift
id: rosa
variants:
  - tag: rosa
    engineeringIds: [290]
"#;

const OTHER: &str = r#"
platform: Satellite
id: satellite
variants:
  - tag: Satellite Server
"#;

#[test]
fn global_registry_installs_once() {
    assert!(global().is_none());

    let first = SubscriptionDefinitionRegistry::from_yaml_strs([("rosa.yaml", ROSA)]).unwrap();
    let installed = install_global(first).unwrap();

    let seen = global().expect("installed");
    assert!(Arc::ptr_eq(&installed, &seen));
    assert!(seen.lookup_by_tag("rosa").is_some());

    let second = SubscriptionDefinitionRegistry::from_yaml_strs([("satellite.yaml", OTHER)]).unwrap();
    let err = install_global(second).unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyInstalled));

    let still = global().expect("still installed");
    assert!(still.lookup_by_tag("Satellite Server").is_none());
    assert_eq!(still.len(), 1);
}

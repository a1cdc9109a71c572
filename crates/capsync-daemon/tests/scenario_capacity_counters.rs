//! Scenario: create/update/delete counters as scraped from `/metrics`
//!
//! # Invariants under test
//!
//! 1. Each counter moves by exactly the number of records created, updated
//!    or deleted in one reconcile.
//! 2. Every reconcile touches all three counters, so a zero-sized batch
//!    still registers its counter at 0.
//! 3. Revocation moves only the delete counter.
//!
//! The Prometheus recorder is process-global; this file holds a single test
//! so nothing else in the binary records into it.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use capsync_reconcile::{
    ProductAllowlist, CAPACITY_CREATED_COUNTER, CAPACITY_DELETED_COUNTER, CAPACITY_UPDATED_COUNTER,
};
use capsync_schemas::Offering;
use capsync_testkit::{subscription, CapacityHarness};

fn counter_value(handle: &PrometheusHandle, name: &str) -> Option<u64> {
    handle.render().lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(n), Some(v)) if n == name => v.parse::<f64>().ok().map(|v| v as u64),
            _ => None,
        }
    })
}

fn counters(handle: &PrometheusHandle) -> (Option<u64>, Option<u64>, Option<u64>) {
    (
        counter_value(handle, CAPACITY_CREATED_COUNTER),
        counter_value(handle, CAPACITY_UPDATED_COUNTER),
        counter_value(handle, CAPACITY_DELETED_COUNTER),
    )
}

#[tokio::test]
async fn counters_track_create_rerun_and_revoke() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("install global recorder");

    let h = CapacityHarness::new(ProductAllowlist::from_skus(["MCT0001"])).unwrap();
    h.offerings
        .insert(Offering::new("MCT0001").with_product_ids([479, 71]));
    let sub = subscription("S1", "MCT0001", 1);

    // 1. create
    h.reconciler.reconcile_capacity_for_subscription(&sub).await.unwrap();
    assert_eq!(counters(&handle), (Some(2), Some(0), Some(0)));

    // 2. idempotent re-run
    h.reconciler.reconcile_capacity_for_subscription(&sub).await.unwrap();
    assert_eq!(counters(&handle), (Some(2), Some(2), Some(0)));

    // 3. revocation
    h.reconciler_with_gate(ProductAllowlist::from_skus(Vec::<String>::new()))
        .reconcile_capacity_for_subscription(&sub)
        .await
        .unwrap();
    assert_eq!(counters(&handle), (Some(2), Some(2), Some(2)));
}

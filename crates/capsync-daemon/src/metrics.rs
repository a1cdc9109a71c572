//! Prometheus exposition for the `metrics` facade.
//!
//! Library crates record through `metrics::counter!` / `histogram!`; this
//! module installs the process-wide recorder and hands back the handle that
//! `GET /metrics` renders.

use anyhow::{Context, Result};
use ::metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use capsync_offering::OFFERING_SYNC_HISTOGRAM;
use capsync_reconcile::{
    CAPACITY_CREATED_COUNTER, CAPACITY_DELETED_COUNTER, CAPACITY_UPDATED_COUNTER,
};

/// Install the global recorder. Call once, at startup.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("install prometheus recorder failed")?;
    describe_capsync_metrics();
    Ok(handle)
}

fn describe_capsync_metrics() {
    describe_counter!(
        CAPACITY_CREATED_COUNTER,
        Unit::Count,
        "Capacity records created by reconciliation"
    );
    describe_counter!(
        CAPACITY_UPDATED_COUNTER,
        Unit::Count,
        "Capacity records overwritten by reconciliation"
    );
    describe_counter!(
        CAPACITY_DELETED_COUNTER,
        Unit::Count,
        "Capacity records removed by reconciliation"
    );
    describe_histogram!(
        OFFERING_SYNC_HISTOGRAM,
        Unit::Seconds,
        "Wall time to fetch and sync one offering"
    );
}

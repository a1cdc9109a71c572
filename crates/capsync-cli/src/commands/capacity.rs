//! One-shot offering sync and capacity reconcile against the configured
//! database and catalog. Same wiring as the daemon, no HTTP and no queue.

use anyhow::Result;
use tracing::info;

use capsync_daemon::bootstrap;

use super::{load_cli_settings, print_json};

pub async fn sync_offering(config_paths: &[String], sku: &str) -> Result<()> {
    let settings = load_cli_settings(config_paths)?;
    let pipeline = bootstrap::build_pipeline(&settings).await?;
    info!(sku, "offering sync requested");

    let result = pipeline.controller.sync_sku(sku).await;
    pipeline.pool.close().await;

    let result = result?;
    println!("sku={sku} result={result}");
    Ok(())
}

pub async fn reconcile_subscription(config_paths: &[String], subscription_id: &str) -> Result<()> {
    let settings = load_cli_settings(config_paths)?;
    let pipeline = bootstrap::build_pipeline(&settings).await?;
    info!(subscription_id, "capacity reconcile requested");

    let outcome = pipeline
        .reconciler
        .reconcile_capacity_for_subscription_id(subscription_id)
        .await;
    pipeline.pool.close().await;

    match outcome? {
        Some(outcome) => print_json(&outcome),
        None => anyhow::bail!("subscription '{subscription_id}' not found"),
    }
}

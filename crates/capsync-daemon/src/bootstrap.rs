//! Startup wiring shared by the daemon and the CLI.
//!
//! Config → settings → secrets → Postgres pool → registry → engine →
//! sync controller. Nothing here spawns tasks.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{info, warn};

use capsync_config::{
    load_layered_yaml, report_unused_keys, resolve_secrets, LoadedConfig, ResolvedSecrets,
    ServiceProfile, ServiceSettings, UnusedKeyPolicy,
};
use capsync_db::{PgCapacityStore, PgOfferingStore, PgSubscriptionStore};
use capsync_offering::{HttpOfferingProvider, OfferingSyncController};
use capsync_reconcile::{CapacityProductExtractor, CapacityReconciler, ProductAllowlist};
use capsync_registry::SubscriptionDefinitionRegistry;

/// Comma-separated list of layered config files, base first.
pub const ENV_CONFIG_PATHS: &str = "CAPSYNC_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

pub fn config_paths_from_env() -> Vec<String> {
    match std::env::var(ENV_CONFIG_PATHS) {
        Ok(v) if !v.trim().is_empty() => v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![DEFAULT_CONFIG_PATH.to_string()],
    }
}

/// Load and validate layered config for `profile`. Unused keys are warned
/// about, not fatal.
pub fn load_settings(
    profile: ServiceProfile,
    paths: &[String],
) -> Result<(LoadedConfig, ServiceSettings)> {
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&refs)?;
    let report = report_unused_keys(profile, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(
            profile = profile.as_str(),
            unused = ?report.unused_leaf_pointers,
            "config keys not consumed by this profile"
        );
    }
    let settings = ServiceSettings::from_config_json(profile, &loaded.config_json)?;
    info!(
        profile = profile.as_str(),
        config_hash = %loaded.config_hash,
        "config loaded"
    );
    Ok((loaded, settings))
}

/// Load definitions from `settings.definitions_dir` and publish them as the
/// process-wide registry.
pub fn load_registry(settings: &ServiceSettings) -> Result<Arc<SubscriptionDefinitionRegistry>> {
    let registry = SubscriptionDefinitionRegistry::from_dir(&settings.definitions_dir)
        .with_context(|| {
            format!(
                "load subscription definitions from {} failed",
                settings.definitions_dir.display()
            )
        })?;
    Ok(capsync_registry::install_global(registry)?)
}

pub async fn connect_db(settings: &ServiceSettings, secrets: &ResolvedSecrets) -> Result<PgPool> {
    let url = secrets.require_database_url(settings)?;
    capsync_db::connect(url, settings.database.max_connections).await
}

/// Everything a process needs to reconcile capacity and sync offerings.
pub struct Pipeline {
    pub pool: PgPool,
    pub registry: Arc<SubscriptionDefinitionRegistry>,
    pub subscriptions: Arc<PgSubscriptionStore>,
    pub reconciler: Arc<CapacityReconciler>,
    pub controller: Arc<OfferingSyncController>,
}

pub async fn build_pipeline(settings: &ServiceSettings) -> Result<Pipeline> {
    let secrets = resolve_secrets(settings);
    let pool = connect_db(settings, &secrets).await?;
    let registry = load_registry(settings)?;
    let allowlist = ProductAllowlist::from_optional_file(settings.allowlist_path.as_deref())?;

    let offerings = Arc::new(PgOfferingStore::new(pool.clone()));
    let capacity = Arc::new(PgCapacityStore::new(pool.clone()));
    let subscriptions = Arc::new(PgSubscriptionStore::new(pool.clone()));

    let reconciler = Arc::new(CapacityReconciler::new(
        offerings.clone(),
        capacity,
        subscriptions.clone(),
        CapacityProductExtractor::new(Arc::clone(&registry)),
        Arc::new(allowlist),
    ));

    let upstream = HttpOfferingProvider::new(
        settings.upstream.base_url.clone(),
        settings.upstream.timeout,
        secrets.upstream_token.clone(),
    )?;
    let controller = Arc::new(OfferingSyncController::new(
        Arc::new(upstream),
        offerings,
        Arc::clone(&reconciler),
    ));

    Ok(Pipeline {
        pool,
        registry,
        subscriptions,
        reconciler,
        controller,
    })
}

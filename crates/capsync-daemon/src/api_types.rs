//! Request and response types for the capsync-daemon HTTP endpoints.
//!
//! `Serialize + Deserialize` so tests can decode them. No business logic.

use serde::{Deserialize, Serialize};

use capsync_registry::SubscriptionDefinition;

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Subscription definitions loaded at startup.
    pub definitions: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// /v1/offerings/:sku/sync
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQueuedResponse {
    pub sku: String,
    pub queued: bool,
}

// ---------------------------------------------------------------------------
// /v1/registry/variants/:tag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSummary {
    pub tag: String,
    pub definition_id: String,
    pub platform: String,
    pub service_type: Option<String>,
    pub contract_enabled: bool,
    pub payg_eligible: bool,
    pub granularities: Vec<String>,
    pub metric_ids: Vec<String>,
}

impl VariantSummary {
    pub fn new(tag: &str, def: &SubscriptionDefinition) -> Self {
        Self {
            tag: tag.to_string(),
            definition_id: def.id.clone(),
            platform: def.platform.clone(),
            service_type: def.service_type.clone(),
            contract_enabled: def.contract_enabled,
            payg_eligible: def.is_payg_eligible(),
            granularities: def
                .supported_granularities()
                .iter()
                .map(|g| g.as_str().to_string())
                .collect(),
            metric_ids: def.metric_ids().into_iter().map(str::to_string).collect(),
        }
    }
}

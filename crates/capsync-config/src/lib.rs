//! capsync-config
//!
//! Layered YAML configuration for the capacity services.
//!
//! Layers merge in order (later leaves win), the result is canonicalized to
//! JSON and hashed so a process can report exactly what it booted with.
//! YAML carries env var NAMES for credentials, never values (see [`secrets`]).
//! Each [`ServiceProfile`] declares the keys it reads so stray keys can be
//! reported.

mod consumption;
mod layering;
pub mod secrets;
pub mod settings;

pub use consumption::{
    consumed_pointers_for_profile, report_unused_keys, UnusedKeyPolicy, UnusedKeyReport,
};
pub use secrets::{resolve_secrets, ResolvedSecrets};
pub use settings::ServiceSettings;

use anyhow::{bail, Context, Result};
use serde_json::Value;

/// Which process is consuming the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceProfile {
    /// Long-running daemon: offering sync worker, reconciler, HTTP control plane.
    CapacityIngress,
    /// Operator CLI: one-shot sync/reconcile and registry queries.
    Cli,
}

impl ServiceProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceProfile::CapacityIngress => "CAPACITY_INGRESS",
            ServiceProfile::Cli => "CLI",
        }
    }

    /// Case-insensitive; `-` and `_` are interchangeable.
    pub fn parse(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        [ServiceProfile::CapacityIngress, ServiceProfile::Cli]
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .with_context(|| format!("invalid profile '{s}'. expected one of: CAPACITY_INGRESS | CLI"))
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Hex sha256 of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

/// Read `paths` (base first) and merge them.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    if paths.is_empty() {
        bail!("no config paths given");
    }
    let docs = paths
        .iter()
        .map(|p| std::fs::read_to_string(p).with_context(|| format!("read config {p} failed")))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let merged = layering::merge_documents(yaml_docs)?;
    layering::reject_secret_literals(&merged)?;
    let (canonical_json, config_hash) = layering::canonical_hash(&merged)?;
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

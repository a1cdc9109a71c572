//! Typed view over the merged config JSON.
//!
//! Every pointer read here must also appear in
//! [`consumed_pointers_for_profile`](crate::consumed_pointers_for_profile).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::ServiceProfile;

pub const DEFAULT_DATABASE_URL_ENV: &str = "CAPSYNC_DATABASE_URL";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8920";
pub const DEFAULT_SYNC_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Directory holding one YAML file per subscription definition.
    pub definitions_dir: PathBuf,
    /// SKU allow-list file. `None` means every SKU is eligible.
    pub allowlist_path: Option<PathBuf>,
    pub upstream: UpstreamSettings,
    pub database: DatabaseSettings,
    /// Only populated for [`ServiceProfile::CapacityIngress`].
    pub daemon: Option<DaemonSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub timeout: Duration,
    /// Env var NAME holding an optional bearer token for the catalog service.
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Env var NAME holding the Postgres URL.
    pub url_env: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonSettings {
    pub bind_addr: SocketAddr,
    pub sync_queue_capacity: usize,
}

impl ServiceSettings {
    /// Build from canonical config JSON (produced by [`crate::load_layered_yaml`]).
    ///
    /// Required:
    /// - registry.definitions_dir
    /// - upstream.base_url
    ///
    /// Everything else has a default.
    pub fn from_config_json(profile: ServiceProfile, cfg: &Value) -> Result<Self> {
        let definitions_dir = cfg
            .pointer("/registry/definitions_dir")
            .and_then(Value::as_str)
            .context("config missing registry.definitions_dir")?;

        let allowlist_path = cfg
            .pointer("/allowlist/path")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let base_url = cfg
            .pointer("/upstream/base_url")
            .and_then(Value::as_str)
            .context("config missing upstream.base_url")?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("upstream.base_url must be an http(s) url, got '{}'", base_url);
        }

        let timeout_secs = read_u64(cfg, "/upstream/timeout_secs")?
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("upstream.timeout_secs must be > 0");
        }

        let token_env = cfg
            .pointer("/upstream/token_env")
            .and_then(Value::as_str)
            .map(str::to_string);

        let url_env = cfg
            .pointer("/database/url_env")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DATABASE_URL_ENV)
            .to_string();
        let max_connections = read_u64(cfg, "/database/max_connections")?
            .map(|n| u32::try_from(n).context("database.max_connections out of range"))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let daemon = match profile {
            ServiceProfile::CapacityIngress => Some(DaemonSettings::from_config_json(cfg)?),
            ServiceProfile::Cli => None,
        };

        Ok(Self {
            definitions_dir: PathBuf::from(definitions_dir),
            allowlist_path,
            upstream: UpstreamSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout: Duration::from_secs(timeout_secs),
                token_env,
            },
            database: DatabaseSettings {
                url_env,
                max_connections,
            },
            daemon,
        })
    }
}

impl DaemonSettings {
    fn from_config_json(cfg: &Value) -> Result<Self> {
        let raw_addr = cfg
            .pointer("/daemon/bind_addr")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr: SocketAddr = raw_addr
            .parse()
            .with_context(|| format!("daemon.bind_addr is not a socket address: {raw_addr}"))?;

        let sync_queue_capacity = read_u64(cfg, "/daemon/sync_queue_capacity")?
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_SYNC_QUEUE_CAPACITY);
        if sync_queue_capacity == 0 {
            bail!("daemon.sync_queue_capacity must be > 0");
        }

        Ok(Self {
            bind_addr,
            sync_queue_capacity,
        })
    }
}

/// Accepts a JSON number or a numeric string.
fn read_u64(cfg: &Value, ptr: &str) -> Result<Option<u64>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .with_context(|| format!("{ptr} must be a non-negative integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{ptr} must be a non-negative integer")),
        Some(other) => bail!("{ptr} has unsupported type: {other}"),
    }
}

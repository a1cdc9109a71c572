//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES. Binaries call [`resolve_secrets`]
//! once at startup and pass the result into constructors. `Debug` output
//! redacts every value, and error messages name the env var, never its value.

use anyhow::{bail, Result};

use crate::settings::ServiceSettings;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Postgres URL. `None` if the named env var was absent or empty.
    pub database_url: Option<String>,
    /// Bearer token for the upstream catalog. `None` when not configured.
    pub upstream_token: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "upstream_token",
                &self.upstream_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

impl ResolvedSecrets {
    /// The database URL, or an error naming the env var that should hold it.
    pub fn require_database_url(&self, settings: &ServiceSettings) -> Result<&str> {
        match self.database_url.as_deref() {
            Some(url) => Ok(url),
            None => bail!(
                "SECRET_MISSING: env var {} must hold the Postgres URL",
                settings.database.url_env
            ),
        }
    }
}

/// Resolve secrets from the process environment.
pub fn resolve_secrets(settings: &ServiceSettings) -> ResolvedSecrets {
    resolve_secrets_with(settings, |name| std::env::var(name).ok())
}

/// Resolve secrets through an injectable lookup (tests pass a closure).
pub fn resolve_secrets_with<F>(settings: &ServiceSettings, lookup: F) -> ResolvedSecrets
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    ResolvedSecrets {
        database_url: non_empty(&settings.database.url_env),
        upstream_token: settings
            .upstream
            .token_env
            .as_deref()
            .and_then(non_empty),
    }
}

//! Which config keys each process actually reads, and the report of the ones
//! nobody does.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::layering::for_each_leaf;
use crate::ServiceProfile;

const SHARED_POINTERS: &[&str] = &[
    "/registry/definitions_dir",
    "/allowlist/path",
    "/upstream/base_url",
    "/upstream/timeout_secs",
    "/upstream/token_env",
    "/database/url_env",
    "/database/max_connections",
];

const DAEMON_POINTERS: &[&str] = &["/daemon/bind_addr", "/daemon/sync_queue_capacity"];

/// The CLI loads the daemon's config files, so it accepts the daemon section
/// without reading it.
const CLI_ACCEPTED_POINTERS: &[&str] = &["/daemon"];

/// JSON-pointer prefixes read (or accepted) by `profile`.
///
/// Must cover what [`crate::ServiceSettings::from_config_json`] and
/// [`crate::resolve_secrets`] read for that profile.
pub fn consumed_pointers_for_profile(profile: ServiceProfile) -> Vec<&'static str> {
    let mut pointers = SHARED_POINTERS.to_vec();
    match profile {
        ServiceProfile::CapacityIngress => pointers.extend_from_slice(DAEMON_POINTERS),
        ServiceProfile::Cli => pointers.extend_from_slice(CLI_ACCEPTED_POINTERS),
    }
    pointers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    pub profile: String,
    pub consumed_prefixes: Vec<String>,
    /// Sorted, unique.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Under [`UnusedKeyPolicy::Fail`] a non-clean report is an error.
pub fn report_unused_keys(
    profile: ServiceProfile,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = consumed_pointers_for_profile(profile)
        .into_iter()
        .map(normalize_pointer)
        .collect();

    let mut unused = BTreeSet::new();
    for_each_leaf(config_json, &mut |leaf, _| {
        if !consumed.iter().any(|prefix| covers(prefix, leaf)) {
            unused.insert(leaf.to_string());
        }
    });

    let report = UnusedKeyReport {
        profile: profile.as_str().to_string(),
        consumed_prefixes: consumed.into_iter().collect(),
        unused_leaf_pointers: unused.into_iter().collect(),
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let preview: Vec<&String> = report.unused_leaf_pointers.iter().take(12).collect();
        bail!(
            "CONFIG_UNUSED_KEYS (profile={}): {} key(s) not read by this profile: {:?}",
            report.profile,
            report.unused_leaf_pointers.len(),
            preview
        );
    }
    Ok(report)
}

/// Leading `/`, no trailing `/` (except the root itself).
fn normalize_pointer(p: &str) -> String {
    let trimmed = p.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// `/a/b` covers `/a/b` and `/a/b/c`, not `/a/bc`.
fn covers(prefix: &str, leaf: &str) -> bool {
    prefix == "/"
        || leaf
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_respects_token_boundary() {
        assert!(covers("/a/b", "/a/b"));
        assert!(covers("/a/b", "/a/b/c"));
        assert!(!covers("/a/b", "/a/bc"));
        assert!(covers("/", "/anything"));
    }

    #[test]
    fn normalize_adds_leading_and_strips_trailing_slash() {
        assert_eq!(normalize_pointer("a/b/"), "/a/b");
        assert_eq!(normalize_pointer(""), "/");
        assert_eq!(normalize_pointer("/"), "/");
    }

    #[test]
    fn cli_profile_accepts_whole_daemon_section() {
        let cli = consumed_pointers_for_profile(ServiceProfile::Cli);
        assert!(cli.contains(&"/daemon"));
        let ingress = consumed_pointers_for_profile(ServiceProfile::CapacityIngress);
        assert!(!ingress.contains(&"/daemon"));
        assert!(DAEMON_POINTERS.iter().all(|p| ingress.contains(p)));
    }
}

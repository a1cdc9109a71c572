use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use capsync_registry::{SubscriptionDefinition, SubscriptionDefinitionRegistry};

use super::{load_cli_settings, print_json};
use crate::LookupKey;

/// `--definitions-dir` skips config loading entirely.
pub fn load(dir: Option<PathBuf>, config_paths: &[String]) -> Result<SubscriptionDefinitionRegistry> {
    let dir = match dir {
        Some(d) => d,
        None => load_cli_settings(config_paths)?.definitions_dir,
    };
    SubscriptionDefinitionRegistry::from_dir(&dir)
        .with_context(|| format!("load subscription definitions from {} failed", dir.display()))
}

/// Prints matches as a JSON array; no match is an error.
pub fn lookup(registry: &SubscriptionDefinitionRegistry, key: &LookupKey) -> Result<()> {
    let (label, matches): (String, Vec<&SubscriptionDefinition>) = if let Some(tag) = &key.tag {
        (format!("tag '{tag}'"), registry.lookup_by_tag(tag).into_iter().collect())
    } else if let Some(id) = key.engineering_id {
        (format!("engineering id {id}"), registry.lookup_by_engineering_id(id))
    } else if let Some(role) = &key.role {
        (format!("role '{role}'"), registry.lookup_by_role(role).into_iter().collect())
    } else if let Some(name) = &key.product_name {
        (
            format!("product name '{name}'"),
            registry.lookup_by_product_name(name),
        )
    } else {
        bail!("one of --tag, --engineering-id, --role, --product-name is required");
    };

    if matches.is_empty() {
        bail!("no subscription definition matches {label}");
    }
    print_json(&matches)
}

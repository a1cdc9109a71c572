//! YAML layer merging, canonical hashing and the secret-literal scan.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Leaf string values starting with any of these are treated as credentials.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
    "eyJ", // bare JWT
];

/// Parse each document and fold it over the previous ones.
pub(crate) fn merge_documents(docs: &[&str]) -> Result<Value> {
    let mut merged = Value::Object(Map::new());
    for (layer, raw) in docs.iter().enumerate() {
        let yaml: serde_yaml::Value = serde_yaml::from_str(raw)
            .with_context(|| format!("config layer {layer} is not valid yaml"))?;
        // Empty documents parse to null and contribute nothing.
        if yaml.is_null() {
            continue;
        }
        let overlay = serde_json::to_value(yaml)
            .with_context(|| format!("config layer {layer} has non-json-compatible values"))?;
        overlay_into(&mut merged, overlay);
    }
    Ok(merged)
}

/// Objects merge key by key; anything else in `overlay` replaces `base`.
fn overlay_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => overlay_into(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Compact JSON with sorted keys and its sha256.
pub(crate) fn canonical_hash(merged: &Value) -> Result<(String, String)> {
    // serde_json's default Map is ordered, so serialization is canonical.
    let canonical = serde_json::to_string(merged).context("canonical json serialize failed")?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok((canonical, hex::encode(digest)))
}

pub(crate) fn reject_secret_literals(merged: &Value) -> Result<()> {
    let mut found: Option<String> = None;
    for_each_leaf(merged, &mut |pointer, leaf| {
        if found.is_none() && leaf.as_str().is_some_and(looks_like_secret) {
            found = Some(pointer.to_string());
        }
    });
    match found {
        // Never echo the value itself.
        Some(pointer) => bail!("CONFIG_SECRET_DETECTED leaf={pointer} value=REDACTED"),
        None => Ok(()),
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    if let Some((scheme, rest)) = t.split_once("://") {
        if scheme.starts_with("postgres") {
            let authority = rest.split('/').next().unwrap_or_default();
            return authority.contains('@');
        }
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

/// Visit every scalar (and empty container) with its JSON pointer. The root
/// scalar is reported as `/`.
pub(crate) fn for_each_leaf(v: &Value, visit: &mut dyn FnMut(&str, &Value)) {
    walk(v, &mut String::new(), visit);
}

fn walk(v: &Value, pointer: &mut String, visit: &mut dyn FnMut(&str, &Value)) {
    let mark = pointer.len();
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                pointer.push('/');
                pointer.push_str(&key.replace('~', "~0").replace('/', "~1"));
                walk(child, pointer, visit);
                pointer.truncate(mark);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                pointer.push('/');
                pointer.push_str(&i.to_string());
                walk(child, pointer, visit);
                pointer.truncate(mark);
            }
        }
        leaf => visit(if pointer.is_empty() { "/" } else { pointer.as_str() }, leaf),
    }
}

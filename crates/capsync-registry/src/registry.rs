//! Load-once, read-only index over subscription definitions.
//!
//! # Invariants
//!
//! - Definition ids, variant tags and variant roles are unique across the
//!   registry; violations are rejected at load time, so the single-match
//!   lookups ([`lookup_by_tag`], [`lookup_by_role`]) can never be ambiguous.
//! - Nothing mutates the registry after construction. Share it as
//!   `Arc<SubscriptionDefinitionRegistry>`; reads need no locking.
//! - Unknown keys never fail: lookups return `None` / empty / `false` and log
//!   a warning.
//!
//! [`lookup_by_tag`]: SubscriptionDefinitionRegistry::lookup_by_tag
//! [`lookup_by_role`]: SubscriptionDefinitionRegistry::lookup_by_role

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use crate::definition::SubscriptionDefinition;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building a registry. Lookups never error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A definition file or directory could not be read.
    Io { path: PathBuf, message: String },
    /// A definition document is not valid YAML for the definition schema.
    Parse { source: String, message: String },
    /// `platform` or `id` is empty, or a variant has an empty tag.
    Invalid { id: String, reason: String },
    DuplicateId { id: String },
    DuplicateTag { tag: String, first: String, second: String },
    DuplicateRole { role: String, first: String, second: String },
    /// [`install_global`] was called more than once.
    AlreadyInstalled,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read {}: {message}", path.display())
            }
            Self::Parse { source, message } => {
                write!(f, "invalid subscription definition in {source}: {message}")
            }
            Self::Invalid { id, reason } => {
                write!(f, "subscription definition '{id}' is invalid: {reason}")
            }
            Self::DuplicateId { id } => {
                write!(f, "subscription definition id '{id}' is defined twice")
            }
            Self::DuplicateTag { tag, first, second } => write!(
                f,
                "variant tag '{tag}' is declared by both '{first}' and '{second}'"
            ),
            Self::DuplicateRole { role, first, second } => write!(
                f,
                "role '{role}' is declared by both '{first}' and '{second}'"
            ),
            Self::AlreadyInstalled => {
                write!(f, "the process-wide registry has already been installed")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SubscriptionDefinitionRegistry {
    /// Definitions in load order; every index below points into this vec.
    definitions: Vec<SubscriptionDefinition>,
    by_id: HashMap<String, usize>,
    by_tag: HashMap<String, usize>,
    by_role: HashMap<String, usize>,
    by_engineering_id: HashMap<i32, Vec<usize>>,
    by_product_name: HashMap<String, Vec<usize>>,
    by_service_type: HashMap<String, Vec<usize>>,
}

impl SubscriptionDefinitionRegistry {
    /// Validate and index `definitions`.
    ///
    /// # Errors
    /// - [`RegistryError::Invalid`] for empty `platform`/`id`/tag.
    /// - [`RegistryError::DuplicateId`], [`RegistryError::DuplicateTag`],
    ///   [`RegistryError::DuplicateRole`] when a uniqueness invariant fails.
    pub fn from_definitions(
        definitions: Vec<SubscriptionDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut reg = Self::default();

        for (idx, def) in definitions.iter().enumerate() {
            if def.platform.trim().is_empty() || def.id.trim().is_empty() {
                return Err(RegistryError::Invalid {
                    id: def.id.clone(),
                    reason: "platform and id are required".to_string(),
                });
            }
            if reg.by_id.insert(def.id.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateId { id: def.id.clone() });
            }
            if let Some(st) = &def.service_type {
                push_unique(reg.by_service_type.entry(st.clone()).or_default(), idx);
            }

            for variant in &def.variants {
                if variant.tag.trim().is_empty() {
                    return Err(RegistryError::Invalid {
                        id: def.id.clone(),
                        reason: "variant tag must not be empty".to_string(),
                    });
                }
                if let Some(prev) = reg.by_tag.insert(variant.tag.clone(), idx) {
                    return Err(RegistryError::DuplicateTag {
                        tag: variant.tag.clone(),
                        first: definitions[prev].id.clone(),
                        second: def.id.clone(),
                    });
                }
                for role in &variant.roles {
                    if let Some(prev) = reg.by_role.insert(role.clone(), idx) {
                        return Err(RegistryError::DuplicateRole {
                            role: role.clone(),
                            first: definitions[prev].id.clone(),
                            second: def.id.clone(),
                        });
                    }
                }
                for eng_id in &variant.engineering_ids {
                    push_unique(reg.by_engineering_id.entry(*eng_id).or_default(), idx);
                }
                for name in &variant.product_names {
                    push_unique(reg.by_product_name.entry(name.clone()).or_default(), idx);
                }
            }
        }

        reg.definitions = definitions;
        Ok(reg)
    }

    /// Parse one definition per YAML document. `source` labels are used in
    /// error messages only.
    pub fn from_yaml_strs<'a, I>(docs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut definitions = Vec::new();
        for (source, raw) in docs {
            definitions.push(parse_definition(source, raw)?);
        }
        Self::from_definitions(definitions)
    }

    /// Load every `*.yaml` / `*.yml` file under `dir` (recursively), in path
    /// order, one definition per file.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        collect_yaml_files(dir, &mut files)?;
        files.sort();

        let mut definitions = Vec::with_capacity(files.len());
        for path in &files {
            let raw = fs::read_to_string(path).map_err(|e| RegistryError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;
            definitions.push(parse_definition(&path.display().to_string(), &raw)?);
        }

        let reg = Self::from_definitions(definitions)?;
        info!(
            dir = %dir.display(),
            definitions = reg.len(),
            tags = reg.by_tag.len(),
            "subscription definition registry loaded"
        );
        Ok(reg)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions in load order.
    pub fn definitions(&self) -> &[SubscriptionDefinition] {
        &self.definitions
    }

    pub fn find_by_id(&self, id: &str) -> Option<&SubscriptionDefinition> {
        self.by_id.get(id).map(|&i| &self.definitions[i])
    }

    pub fn find_by_service_type(&self, service_type: &str) -> Vec<&SubscriptionDefinition> {
        self.resolve_many(self.by_service_type.get(service_type))
    }

    /// Definition owning the variant `tag`. At most one can match.
    pub fn lookup_by_tag(&self, tag: &str) -> Option<&SubscriptionDefinition> {
        let found = self.by_tag.get(tag).map(|&i| &self.definitions[i]);
        if found.is_none() {
            warn!(tag, "no subscription definition has a variant with this tag");
        }
        found
    }

    /// Definitions with a variant listing `eng_id`. Set semantics: each
    /// definition appears once, in load order.
    pub fn lookup_by_engineering_id(&self, eng_id: i32) -> Vec<&SubscriptionDefinition> {
        let found = self.resolve_many(self.by_engineering_id.get(&eng_id));
        if found.is_empty() {
            warn!(eng_id, "no subscription definition claims this engineering id");
        }
        found
    }

    pub fn lookup_by_role(&self, role: &str) -> Option<&SubscriptionDefinition> {
        let found = self.by_role.get(role).map(|&i| &self.definitions[i]);
        if found.is_none() {
            warn!(role, "no subscription definition has a variant with this role");
        }
        found
    }

    /// Product names are not unique: e.g. two managed-service definitions may
    /// both list the same marketing name. Callers must handle many matches.
    pub fn lookup_by_product_name(&self, name: &str) -> Vec<&SubscriptionDefinition> {
        let found = self.resolve_many(self.by_product_name.get(name));
        if found.is_empty() {
            warn!(product_name = name, "no subscription definition lists this product name");
        }
        found
    }

    /// `false` when the tag is unknown.
    pub fn is_contract_enabled(&self, tag: &str) -> bool {
        self.lookup_by_tag(tag)
            .map(|d| d.contract_enabled)
            .unwrap_or(false)
    }

    pub fn variant_supports_granularity(&self, tag: &str, granularity: &str) -> bool {
        match self.by_tag.get(tag) {
            Some(&i) => self.definitions[i].supports_granularity(granularity),
            None => {
                warn!(tag, "granularity requested for missing subscription variant");
                false
            }
        }
    }

    pub fn all_service_types(&self) -> BTreeSet<&str> {
        self.by_service_type.keys().map(String::as_str).collect()
    }

    /// Every variant tag whose definition is not PAYG-eligible.
    pub fn all_non_payg_tags(&self) -> BTreeSet<&str> {
        self.definitions
            .iter()
            .filter(|d| !d.is_payg_eligible())
            .flat_map(|d| d.tags())
            .collect()
    }

    pub fn aws_dimension(&self, tag: &str, metric_id: &str) -> Option<&str> {
        self.lookup_by_tag(tag)
            .and_then(|d| d.metric(metric_id))
            .and_then(|m| m.aws_dimension.as_deref())
    }

    pub fn rhm_metric_id(&self, tag: &str, metric_id: &str) -> Option<&str> {
        self.lookup_by_tag(tag)
            .and_then(|d| d.metric(metric_id))
            .and_then(|m| m.rhm_metric_id.as_deref())
    }

    fn resolve_many(&self, idxs: Option<&Vec<usize>>) -> Vec<&SubscriptionDefinition> {
        idxs.map(|v| v.iter().map(|&i| &self.definitions[i]).collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Process-wide handle
// ---------------------------------------------------------------------------

static GLOBAL: OnceLock<Arc<SubscriptionDefinitionRegistry>> = OnceLock::new();

/// Publish `registry` as the process-wide instance. Only the first call wins.
pub fn install_global(
    registry: SubscriptionDefinitionRegistry,
) -> Result<Arc<SubscriptionDefinitionRegistry>, RegistryError> {
    let handle = Arc::new(registry);
    GLOBAL
        .set(Arc::clone(&handle))
        .map_err(|_| RegistryError::AlreadyInstalled)?;
    Ok(handle)
}

/// The process-wide instance, if [`install_global`] has run.
pub fn global() -> Option<Arc<SubscriptionDefinitionRegistry>> {
    GLOBAL.get().cloned()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn push_unique(v: &mut Vec<usize>, idx: usize) {
    if v.last() != Some(&idx) {
        v.push(idx);
    }
}

fn parse_definition(source: &str, raw: &str) -> Result<SubscriptionDefinition, RegistryError> {
    serde_yaml::from_str(raw).map_err(|e| RegistryError::Parse {
        source: source.to_string(),
        message: e.to_string(),
    })
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RegistryError> {
    let io_err = |e: std::io::Error| RegistryError::Io {
        path: dir.to_path_buf(),
        message: e.to_string(),
    };

    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        ) {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Metric, Variant};

    fn def(id: &str, tags: &[&str]) -> SubscriptionDefinition {
        let mut d = SubscriptionDefinition::new("RHEL", id);
        d.variants = tags.iter().map(|t| Variant::new(*t)).collect();
        d
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let err = SubscriptionDefinitionRegistry::from_definitions(vec![
            def("a", &["RHEL"]),
            def("b", &["RHEL"]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTag {
                tag: "RHEL".to_string(),
                first: "a".to_string(),
                second: "b".to_string(),
            }
        );
    }

    #[test]
    fn duplicate_role_is_rejected() {
        let mut a = def("a", &["A"]);
        a.variants[0].roles = vec!["Server".to_string()];
        let mut b = def("b", &["B"]);
        b.variants[0].roles = vec!["Server".to_string()];

        let err = SubscriptionDefinitionRegistry::from_definitions(vec![a, b]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRole { .. }));
    }

    #[test]
    fn duplicate_id_and_empty_fields_are_rejected() {
        assert_eq!(
            SubscriptionDefinitionRegistry::from_definitions(vec![def("a", &[]), def("a", &[])])
                .unwrap_err(),
            RegistryError::DuplicateId { id: "a".to_string() }
        );
        assert!(matches!(
            SubscriptionDefinitionRegistry::from_definitions(vec![def("", &[])]).unwrap_err(),
            RegistryError::Invalid { .. }
        ));
        assert!(matches!(
            SubscriptionDefinitionRegistry::from_definitions(vec![def("a", &[" "])]).unwrap_err(),
            RegistryError::Invalid { .. }
        ));
    }

    #[test]
    fn engineering_id_index_is_deduplicated_per_definition() {
        let mut d = def("rhel", &["RHEL Server", "RHEL for x86"]);
        d.variants[0].engineering_ids = vec![69];
        d.variants[1].engineering_ids = vec![69, 479];
        let reg = SubscriptionDefinitionRegistry::from_definitions(vec![d]).unwrap();

        assert_eq!(reg.lookup_by_engineering_id(69).len(), 1);
        assert_eq!(reg.lookup_by_engineering_id(479).len(), 1);
        assert!(reg.lookup_by_engineering_id(1).is_empty());
    }

    #[test]
    fn metering_ids_resolve_through_tag() {
        let mut d = def("rhel-payg", &["rhel-for-x86-els-payg"]);
        d.metrics = vec![Metric {
            aws_dimension: Some("vcpu_hours".to_string()),
            ..Metric::new("vCPUs")
        }];
        let reg = SubscriptionDefinitionRegistry::from_definitions(vec![d]).unwrap();

        assert_eq!(
            reg.aws_dimension("rhel-for-x86-els-payg", "vCPUs"),
            Some("vcpu_hours")
        );
        assert_eq!(reg.rhm_metric_id("rhel-for-x86-els-payg", "vCPUs"), None);
        assert_eq!(reg.aws_dimension("unknown", "vCPUs"), None);
    }

    #[test]
    fn parse_error_names_the_source() {
        let err = SubscriptionDefinitionRegistry::from_yaml_strs([("rhel.yaml", "id: [")])
            .unwrap_err();
        match err {
            RegistryError::Parse { source, .. } => assert_eq!(source, "rhel.yaml"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}

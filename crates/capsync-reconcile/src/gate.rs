//! Eligibility gate.
//!
//! A SKU that fails the gate may hold no capacity at all: the engine deletes
//! every existing record of its subscriptions. Checks are side-effect free.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub trait EligibilityGate: Send + Sync {
    fn is_eligible(&self, sku: &str) -> bool;
}

/// SKU allow-list loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductAllowlist {
    /// No list configured: every SKU is eligible.
    AllowAll,
    Skus(BTreeSet<String>),
}

impl ProductAllowlist {
    pub fn allow_all() -> Self {
        warn!("no product allow-list configured; every SKU is eligible for capacity");
        Self::AllowAll
    }

    pub fn from_skus<I, S>(skus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Skus(skus.into_iter().map(Into::into).collect())
    }

    /// Newline-separated SKUs. Blank lines and `#` comments are ignored;
    /// entries are trimmed.
    pub fn parse(text: &str) -> Self {
        Self::from_skus(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        )
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("read product allow-list failed: {}", path.display()))?;
        let list = Self::parse(&text);
        info!(path = %path.display(), skus = list.len(), "product allow-list loaded");
        Ok(list)
    }

    /// `Some(path)` loads the file; `None` allows everything.
    pub fn from_optional_file(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::allow_all()),
        }
    }

    /// Number of listed SKUs; `0` in allow-all mode.
    pub fn len(&self) -> usize {
        match self {
            Self::AllowAll => 0,
            Self::Skus(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EligibilityGate for ProductAllowlist {
    fn is_eligible(&self, sku: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::Skus(s) => s.contains(sku),
        }
    }
}

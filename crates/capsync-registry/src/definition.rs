//! Subscription definitions and the value types they carry.
//!
//! A definition is a logical product family entry: it has one or more
//! variants (technical fingerprints, e.g. per-architecture tags) and a set of
//! metrics describing how usage is measured. Definitions are plain data;
//! cross-definition lookups live on
//! [`SubscriptionDefinitionRegistry`](crate::SubscriptionDefinitionRegistry).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Granularity
// ---------------------------------------------------------------------------

/// Time resolution at which usage and capacity are reported.
///
/// Variant order is the scale order: `Hourly < Daily < ... < Yearly`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Granularity {
    /// The full ordered scale.
    pub const ALL: [Granularity; 6] = [
        Granularity::Hourly,
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Quarterly,
        Granularity::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hourly => "HOURLY",
            Granularity::Daily => "DAILY",
            Granularity::Weekly => "WEEKLY",
            Granularity::Monthly => "MONTHLY",
            Granularity::Quarterly => "QUARTERLY",
            Granularity::Yearly => "YEARLY",
        }
    }

    /// Case-insensitive parse; `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// Streaming-telemetry query binding. Its presence on any metric makes the
/// owning definition eligible for hourly data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrometheusQuery {
    pub query_key: Option<String>,
    pub query_params: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metric {
    pub id: String,
    /// Marketplace (RHM) usage-metering identifier.
    pub rhm_metric_id: Option<String>,
    /// AWS marketplace dimension.
    pub aws_dimension: Option<String>,
    pub prometheus: Option<PrometheusQuery>,
    pub billing_factor: Option<f64>,
}

impl Metric {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn is_usage_metered(&self) -> bool {
        self.rhm_metric_id.is_some() || self.aws_dimension.is_some()
    }
}

// ---------------------------------------------------------------------------
// Variant / Defaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Variant {
    /// Unique across the whole registry.
    pub tag: String,
    pub engineering_ids: Vec<i32>,
    pub roles: Vec<String>,
    pub product_names: Vec<String>,
    pub is_migration_product: bool,
}

impl Variant {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Defaults {
    /// Tag of the variant to assume when a record carries no fingerprint.
    pub variant: Option<String>,
    pub sla: Option<String>,
    pub usage: Option<String>,
}

// ---------------------------------------------------------------------------
// SubscriptionDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubscriptionDefinition {
    /// Family of logically related solutions (e.g. `RHEL`).
    pub platform: String,
    pub id: String,
    /// Lets a definition inherit billing model information from its parent.
    pub parent_subscription: Option<String>,
    /// "In-the-box" definitions, counted for both usage and capacity.
    pub included_subscriptions: Vec<String>,
    pub service_type: Option<String>,
    pub metrics: Vec<Metric>,
    pub defaults: Option<Defaults>,
    pub contract_enabled: bool,
    pub variants: Vec<Variant>,
}

impl SubscriptionDefinition {
    pub fn new(platform: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    /// True iff any metric carries a usage-metering identifier.
    pub fn is_payg_eligible(&self) -> bool {
        self.metrics.iter().any(Metric::is_usage_metered)
    }

    /// True iff any metric carries a streaming-telemetry binding.
    pub fn is_prometheus_enabled(&self) -> bool {
        self.metrics.iter().any(|m| m.prometheus.is_some())
    }

    pub fn finest_granularity(&self) -> Granularity {
        if self.is_prometheus_enabled() {
            Granularity::Hourly
        } else {
            Granularity::Daily
        }
    }

    /// Ordered scale, without `Hourly` unless streaming telemetry is bound.
    pub fn supported_granularities(&self) -> Vec<Granularity> {
        let finest = self.finest_granularity();
        Granularity::ALL
            .into_iter()
            .filter(|g| *g >= finest)
            .collect()
    }

    /// Case-insensitive check against [`Self::supported_granularities`].
    pub fn supports_granularity(&self, granularity: &str) -> bool {
        Granularity::parse(granularity)
            .map(|g| self.supported_granularities().contains(&g))
            .unwrap_or(false)
    }

    pub fn metric_ids(&self) -> Vec<&str> {
        self.metrics
            .iter()
            .map(|m| m.id.as_str())
            .filter(|id| !id.is_empty())
            .collect()
    }

    pub fn metric(&self, metric_id: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id == metric_id)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|v| v.tag.as_str())
    }

    pub fn find_variant_for_engineering_id(&self, eng_id: i32) -> Option<&Variant> {
        self.single_variant(|v| v.engineering_ids.contains(&eng_id), "engineering id")
    }

    pub fn find_variant_for_role(&self, role: &str) -> Option<&Variant> {
        self.single_variant(|v| v.roles.iter().any(|r| r == role), "role")
    }

    fn single_variant<P>(&self, pred: P, what: &str) -> Option<&Variant>
    where
        P: Fn(&Variant) -> bool,
    {
        let mut matches = self.variants.iter().filter(|v| pred(v));
        let first = matches.next();
        if let Some(extra) = matches.next() {
            warn!(
                definition = %self.id,
                first = %first.map(|v| v.tag.as_str()).unwrap_or_default(),
                extra = %extra.tag,
                "more than one variant matches {what}; using the first"
            );
        }
        first
    }
}

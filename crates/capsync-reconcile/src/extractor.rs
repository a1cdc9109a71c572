use std::collections::BTreeSet;
use std::sync::Arc;

use capsync_registry::SubscriptionDefinitionRegistry;
use capsync_schemas::Offering;

/// Maps an offering onto the variant tags (capacity product ids) it entitles.
#[derive(Debug, Clone)]
pub struct CapacityProductExtractor {
    registry: Arc<SubscriptionDefinitionRegistry>,
}

impl CapacityProductExtractor {
    pub fn new(registry: Arc<SubscriptionDefinitionRegistry>) -> Self {
        Self { registry }
    }

    /// Tags entitled by `offering`:
    /// - every variant listing one of the offering's engineering ids;
    /// - the variant carrying the offering's role, if any.
    ///
    /// An offering with neither ids nor role entitles nothing.
    pub fn products_for(&self, offering: &Offering) -> BTreeSet<String> {
        let mut products = BTreeSet::new();

        for &eng_id in &offering.product_ids {
            for def in self.registry.lookup_by_engineering_id(eng_id) {
                products.extend(
                    def.variants
                        .iter()
                        .filter(|v| v.engineering_ids.contains(&eng_id))
                        .map(|v| v.tag.clone()),
                );
            }
        }

        if let Some(role) = offering.role.as_deref().filter(|r| !r.is_empty()) {
            if let Some(variant) = self
                .registry
                .lookup_by_role(role)
                .and_then(|def| def.find_variant_for_role(role))
            {
                products.insert(variant.tag.clone());
            }
        }

        products
    }
}

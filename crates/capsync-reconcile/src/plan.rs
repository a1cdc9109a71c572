//! Deterministic capacity diff. No IO, no clock.

use std::collections::BTreeMap;

use capsync_schemas::{CapacityKey, CapacityRecord};

/// What the engine must persist to converge on the desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacityPlan {
    /// Upserted in one batch. Empty when the SKU is ineligible.
    pub to_save: Vec<CapacityRecord>,
    /// Existing records with no desired counterpart, in key order.
    pub to_delete: Vec<CapacityRecord>,
    pub created: u64,
    pub updated: u64,
}

impl CapacityPlan {
    pub fn deleted(&self) -> u64 {
        self.to_delete.len() as u64
    }
}

/// Diff `desired` against `existing`.
///
/// Eligible: every desired record is saved (overwrite-always, so an
/// unchanged record still counts as an update) and claims its existing
/// counterpart. Ineligible: nothing is saved and every existing record is
/// deleted. Unclaimed existing records are always deleted.
pub fn plan_capacity(
    desired: Vec<CapacityRecord>,
    existing: Vec<CapacityRecord>,
    eligible: bool,
) -> CapacityPlan {
    let mut remaining: BTreeMap<CapacityKey, CapacityRecord> =
        existing.into_iter().map(|r| (r.key.clone(), r)).collect();

    let mut plan = CapacityPlan::default();

    if eligible {
        for record in desired {
            if remaining.remove(&record.key).is_some() {
                plan.updated += 1;
            } else {
                plan.created += 1;
            }
            plan.to_save.push(record);
        }
    }

    plan.to_delete = remaining.into_values().collect();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsync_schemas::{Offering, Subscription};
    use chrono::{TimeZone, Utc};

    fn sub() -> Subscription {
        Subscription::new(
            "S1",
            "MCT0001",
            "org1",
            1,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn rec(product: &str) -> CapacityRecord {
        CapacityRecord::from_subscription(&sub(), &Offering::new("MCT0001"), product).unwrap()
    }

    #[test]
    fn first_run_creates_everything() {
        let plan = plan_capacity(vec![rec("A"), rec("B")], vec![], true);
        assert_eq!((plan.created, plan.updated, plan.deleted()), (2, 0, 0));
        assert_eq!(plan.to_save.len(), 2);
    }

    #[test]
    fn rerun_updates_without_creating() {
        let plan = plan_capacity(vec![rec("A"), rec("B")], vec![rec("B"), rec("A")], true);
        assert_eq!((plan.created, plan.updated, plan.deleted()), (0, 2, 0));
    }

    #[test]
    fn dropped_product_is_deleted() {
        let plan = plan_capacity(vec![rec("A")], vec![rec("A"), rec("B")], true);
        assert_eq!((plan.created, plan.updated, plan.deleted()), (0, 1, 1));
        assert_eq!(plan.to_delete[0].key.product_id, "B");
    }

    #[test]
    fn ineligible_deletes_all_and_saves_nothing() {
        let plan = plan_capacity(vec![rec("A"), rec("C")], vec![rec("A"), rec("B")], false);
        assert!(plan.to_save.is_empty());
        assert_eq!((plan.created, plan.updated), (0, 0));
        let deleted: Vec<&str> = plan
            .to_delete
            .iter()
            .map(|r| r.key.product_id.as_str())
            .collect();
        assert_eq!(deleted, vec!["A", "B"]);
    }
}

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use capsync_reconcile::{CapacityStore, OfferingStore, SubscriptionStore};
use capsync_schemas::{CapacityKey, CapacityRecord, Offering, Subscription};

// ---------------------------------------------------------------------------
// Offerings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgOfferingStore {
    pool: PgPool,
}

impl PgOfferingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn offering_from_row(row: &PgRow) -> Result<Offering> {
    let product_ids: Json<BTreeSet<i32>> = row.try_get("product_ids")?;
    let child_skus: Json<BTreeSet<String>> = row.try_get("child_skus")?;
    Ok(Offering {
        sku: row.try_get("sku")?,
        product_name: row.try_get("product_name")?,
        description: row.try_get("description")?,
        product_family: row.try_get("product_family")?,
        role: row.try_get("role")?,
        product_ids: product_ids.0,
        child_skus: child_skus.0,
        service_level: row.try_get("service_level")?,
        usage: row.try_get("usage")?,
        cores: row.try_get("cores")?,
        sockets: row.try_get("sockets")?,
        hypervisor_cores: row.try_get("hypervisor_cores")?,
        hypervisor_sockets: row.try_get("hypervisor_sockets")?,
        has_unlimited_usage: row.try_get("has_unlimited_usage")?,
        derived_sku: row.try_get("derived_sku")?,
    })
}

#[async_trait]
impl OfferingStore for PgOfferingStore {
    async fn find_offering(&self, sku: &str) -> Result<Option<Offering>> {
        let row = sqlx::query(
            r#"
            select sku, product_name, description, product_family, role,
                   product_ids, child_skus, service_level, usage,
                   cores, sockets, hypervisor_cores, hypervisor_sockets,
                   has_unlimited_usage, derived_sku
            from offerings
            where sku = $1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await
        .context("find_offering failed")?;

        row.as_ref().map(offering_from_row).transpose()
    }

    async fn save_offering(&self, offering: &Offering) -> Result<()> {
        sqlx::query(
            r#"
            insert into offerings (
              sku, product_name, description, product_family, role,
              product_ids, child_skus, service_level, usage,
              cores, sockets, hypervisor_cores, hypervisor_sockets,
              has_unlimited_usage, derived_sku, updated_at_utc
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, now()
            )
            on conflict (sku) do update set
              product_name = excluded.product_name,
              description = excluded.description,
              product_family = excluded.product_family,
              role = excluded.role,
              product_ids = excluded.product_ids,
              child_skus = excluded.child_skus,
              service_level = excluded.service_level,
              usage = excluded.usage,
              cores = excluded.cores,
              sockets = excluded.sockets,
              hypervisor_cores = excluded.hypervisor_cores,
              hypervisor_sockets = excluded.hypervisor_sockets,
              has_unlimited_usage = excluded.has_unlimited_usage,
              derived_sku = excluded.derived_sku,
              updated_at_utc = now()
            "#,
        )
        .bind(&offering.sku)
        .bind(&offering.product_name)
        .bind(&offering.description)
        .bind(&offering.product_family)
        .bind(&offering.role)
        .bind(Json(&offering.product_ids))
        .bind(Json(&offering.child_skus))
        .bind(&offering.service_level)
        .bind(&offering.usage)
        .bind(offering.cores)
        .bind(offering.sockets)
        .bind(offering.hypervisor_cores)
        .bind(offering.hypervisor_sockets)
        .bind(offering.has_unlimited_usage)
        .bind(&offering.derived_sku)
        .execute(&self.pool)
        .await
        .context("save_offering failed")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

const SUBSCRIPTION_COLUMNS: &str = "subscription_id, subscription_number, sku, org_id, \
     account_number, quantity, start_date, end_date, billing_provider";

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a subscription. Used by operator seeding and tests;
    /// the reconciliation path only reads subscriptions.
    pub async fn upsert_subscription(&self, sub: &Subscription) -> Result<()> {
        sqlx::query(
            r#"
            insert into subscriptions (
              subscription_id, subscription_number, sku, org_id, account_number,
              quantity, start_date, end_date, billing_provider
            ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            on conflict (subscription_id) do update set
              subscription_number = excluded.subscription_number,
              sku = excluded.sku,
              org_id = excluded.org_id,
              account_number = excluded.account_number,
              quantity = excluded.quantity,
              start_date = excluded.start_date,
              end_date = excluded.end_date,
              billing_provider = excluded.billing_provider
            "#,
        )
        .bind(&sub.subscription_id)
        .bind(&sub.subscription_number)
        .bind(&sub.sku)
        .bind(&sub.org_id)
        .bind(&sub.account_number)
        .bind(sub.quantity)
        .bind(sub.start_date)
        .bind(sub.end_date)
        .bind(&sub.billing_provider)
        .execute(&self.pool)
        .await
        .context("upsert_subscription failed")?;
        Ok(())
    }
}

fn subscription_from_row(row: &PgRow) -> Result<Subscription> {
    Ok(Subscription {
        subscription_id: row.try_get("subscription_id")?,
        subscription_number: row.try_get("subscription_number")?,
        sku: row.try_get("sku")?,
        org_id: row.try_get("org_id")?,
        account_number: row.try_get("account_number")?,
        quantity: row.try_get("quantity")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        billing_provider: row.try_get("billing_provider")?,
    })
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn find_subscription(&self, subscription_id: &str) -> Result<Option<Subscription>> {
        let sql = format!("select {SUBSCRIPTION_COLUMNS} from subscriptions where subscription_id = $1");
        let row = sqlx::query(&sql)
            .bind(subscription_id)
            .fetch_optional(&self.pool)
            .await
            .context("find_subscription failed")?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    async fn find_subscriptions_by_sku(&self, sku: &str) -> Result<Vec<Subscription>> {
        let sql = format!(
            "select {SUBSCRIPTION_COLUMNS} from subscriptions where sku = $1 order by subscription_id"
        );
        let rows = sqlx::query(&sql)
            .bind(sku)
            .fetch_all(&self.pool)
            .await
            .context("find_subscriptions_by_sku failed")?;

        rows.iter().map(subscription_from_row).collect()
    }
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgCapacityStore {
    pool: PgPool,
}

impl PgCapacityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn capacity_from_row(row: &PgRow) -> Result<CapacityRecord> {
    Ok(CapacityRecord {
        key: CapacityKey {
            org_id: row.try_get("org_id")?,
            subscription_id: row.try_get("subscription_id")?,
            product_id: row.try_get("product_id")?,
        },
        sku: row.try_get("sku")?,
        begin_date: row.try_get("begin_date")?,
        end_date: row.try_get("end_date")?,
        account_number: row.try_get("account_number")?,
        service_level: row.try_get("service_level")?,
        usage: row.try_get("usage")?,
        has_unlimited_usage: row.try_get("has_unlimited_usage")?,
        physical_sockets: row.try_get("physical_sockets")?,
        virtual_sockets: row.try_get("virtual_sockets")?,
        physical_cores: row.try_get("physical_cores")?,
        virtual_cores: row.try_get("virtual_cores")?,
    })
}

#[async_trait]
impl CapacityStore for PgCapacityStore {
    async fn find_by_subscription_id(&self, subscription_id: &str) -> Result<Vec<CapacityRecord>> {
        let rows = sqlx::query(
            r#"
            select org_id, subscription_id, product_id, sku, begin_date, end_date,
                   account_number, service_level, usage, has_unlimited_usage,
                   physical_sockets, virtual_sockets, physical_cores, virtual_cores
            from subscription_capacity
            where subscription_id = $1
            order by org_id, product_id
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await
        .context("find_by_subscription_id failed")?;

        rows.iter().map(capacity_from_row).collect()
    }

    /// One transaction for the whole batch.
    async fn save_all(&self, records: &[CapacityRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("save_all begin failed")?;

        for r in records {
            sqlx::query(
                r#"
                insert into subscription_capacity (
                  org_id, subscription_id, product_id, sku, begin_date, end_date,
                  account_number, service_level, usage, has_unlimited_usage,
                  physical_sockets, virtual_sockets, physical_cores, virtual_cores
                ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                on conflict (org_id, subscription_id, product_id) do update set
                  sku = excluded.sku,
                  begin_date = excluded.begin_date,
                  end_date = excluded.end_date,
                  account_number = excluded.account_number,
                  service_level = excluded.service_level,
                  usage = excluded.usage,
                  has_unlimited_usage = excluded.has_unlimited_usage,
                  physical_sockets = excluded.physical_sockets,
                  virtual_sockets = excluded.virtual_sockets,
                  physical_cores = excluded.physical_cores,
                  virtual_cores = excluded.virtual_cores
                "#,
            )
            .bind(&r.key.org_id)
            .bind(&r.key.subscription_id)
            .bind(&r.key.product_id)
            .bind(&r.sku)
            .bind(r.begin_date)
            .bind(r.end_date)
            .bind(&r.account_number)
            .bind(&r.service_level)
            .bind(&r.usage)
            .bind(r.has_unlimited_usage)
            .bind(r.physical_sockets)
            .bind(r.virtual_sockets)
            .bind(r.physical_cores)
            .bind(r.virtual_cores)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("save capacity {:?} failed", r.key))?;
        }

        tx.commit().await.context("save_all commit failed")?;
        Ok(())
    }

    async fn delete_all(&self, records: &[CapacityRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("delete_all begin failed")?;

        for r in records {
            sqlx::query(
                r#"
                delete from subscription_capacity
                where org_id = $1 and subscription_id = $2 and product_id = $3
                "#,
            )
            .bind(&r.key.org_id)
            .bind(&r.key.subscription_id)
            .bind(&r.key.product_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("delete capacity {:?} failed", r.key))?;
        }

        tx.commit().await.context("delete_all commit failed")?;
        Ok(())
    }
}

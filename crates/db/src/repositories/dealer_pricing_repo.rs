//! Repository for the `dealer_pricing` table.

use dealerhub_core::pricing::ValidatedPricing;
use dealerhub_core::types::DbId;
use sqlx::PgPool;

use crate::models::dealer_pricing::DealerPricing;

/// Column list for dealer_pricing queries.
const COLUMNS: &str = "id, dealer_id, item_type, item_id, item_name, sale_price_usd, \
    sale_price_brl, margin_percentage, created_at, updated_at";

/// Provides upsert, list and delete for dealer MSRP overrides.
pub struct DealerPricingRepo;

impl DealerPricingRepo {
    /// Insert or replace the override for `(dealer_id, item_type, item_id)`.
    ///
    /// A single statement, so concurrent writers to the same key never
    /// produce two rows; the last write wins. `updated_at` is refreshed on
    /// both paths so freshness checks observe the write.
    pub async fn upsert(
        pool: &PgPool,
        input: &ValidatedPricing,
    ) -> Result<DealerPricing, sqlx::Error> {
        let query = format!(
            "INSERT INTO dealer_pricing
                (dealer_id, item_type, item_id, item_name,
                 sale_price_usd, sale_price_brl, margin_percentage)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT ON CONSTRAINT uq_dealer_pricing_item DO UPDATE SET
                item_name = EXCLUDED.item_name,
                sale_price_usd = EXCLUDED.sale_price_usd,
                sale_price_brl = EXCLUDED.sale_price_brl,
                margin_percentage = EXCLUDED.margin_percentage,
                updated_at = clock_timestamp()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DealerPricing>(&query)
            .bind(input.dealer_id)
            .bind(input.item_type.as_str())
            .bind(&input.item_id)
            .bind(&input.item_name)
            .bind(input.sale_price_usd)
            .bind(input.sale_price_brl)
            .bind(input.margin_percentage)
            .fetch_one(pool)
            .await
    }

    /// All overrides for a dealer, most recently updated first.
    pub async fn list_by_dealer(
        pool: &PgPool,
        dealer_id: DbId,
    ) -> Result<Vec<DealerPricing>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dealer_pricing
             WHERE dealer_id = $1
             ORDER BY updated_at DESC, id DESC"
        );
        sqlx::query_as::<_, DealerPricing>(&query)
            .bind(dealer_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DealerPricing>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dealer_pricing WHERE id = $1");
        sqlx::query_as::<_, DealerPricing>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn count_by_dealer(pool: &PgPool, dealer_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM dealer_pricing WHERE dealer_id = $1")
                .bind(dealer_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Remove an override. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dealer_pricing WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

//! Newest data change across a set of tables.
//!
//! Used by the response caches to decide whether a cached value is older
//! than the data it was built from. A change is either a row's
//! `updated_at` or a delete recorded in `table_versions`.

use dealerhub_core::sync::{ADMIN_DATA_TABLES, DEALER_CONFIG_TABLES};
use dealerhub_core::types::Timestamp;
use futures::future::join_all;
use sqlx::PgPool;

/// Freshness probe over the allow-listed tables.
pub struct FreshnessRepo;

impl FreshnessRepo {
    /// Whether `table` may be probed. Table names are interpolated into SQL,
    /// so only known names are accepted.
    pub fn is_known_table(table: &str) -> bool {
        ADMIN_DATA_TABLES.contains(&table) || DEALER_CONFIG_TABLES.contains(&table)
    }

    /// Newest change over `tables`: the latest `updated_at` (falling back to
    /// `created_at`) of any row, or the latest delete.
    ///
    /// One indexed point query per table plus one for deletes, run
    /// concurrently. Returns `None` when the answer cannot be trusted: an
    /// unknown table name, any failed query, or no data at all. A partial
    /// maximum is never returned.
    pub async fn latest_update_timestamp(
        pool: &PgPool,
        tables: &[&str],
    ) -> Option<Timestamp> {
        if let Some(table) = tables.iter().find(|t| !Self::is_known_table(t)) {
            tracing::warn!(table, "Refusing freshness probe for unknown table");
            return None;
        }

        let probes = tables.iter().map(|table| async move {
            let query = format!(
                "SELECT COALESCE(updated_at, created_at) FROM {table}
                 ORDER BY updated_at DESC NULLS LAST
                 LIMIT 1"
            );
            sqlx::query_as::<_, (Option<Timestamp>,)>(&query)
                .fetch_optional(pool)
                .await
                .map(|row| row.and_then(|(latest,)| latest))
                .map_err(|e| tracing::warn!(table, error = %e, "Freshness probe failed"))
        });
        let names: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
        let deletes = async {
            sqlx::query_scalar::<_, Option<Timestamp>>(
                "SELECT MAX(changed_at) FROM table_versions WHERE table_name = ANY($1)",
            )
            .bind(&names)
            .fetch_one(pool)
            .await
            .map_err(|e| tracing::warn!(error = %e, "Delete version probe failed"))
        };

        let (rows, deleted) = futures::join!(join_all(probes), deletes);
        let mut latest = deleted.ok()?;
        for row in rows {
            latest = latest.max(row.ok()?);
        }
        latest
    }
}

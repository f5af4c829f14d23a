//! Repository for the five catalog tables.
//!
//! The tables share one shape, so every method takes the [`ItemType`] and
//! interpolates its fixed table name. Table names never come from user
//! input directly; `ItemType` only yields the five known names.

use dealerhub_core::catalog::ItemType;
use dealerhub_core::types::DbId;
use sqlx::PgPool;

use crate::models::catalog::{CatalogItem, CreateCatalogItem, UpdateCatalogItem};

/// Column list shared by all catalog tables.
const COLUMNS: &str = "id, name, name_localized, usd, brl, compatible_models, \
    countries, display_order, created_at, updated_at";

/// Provides CRUD operations for catalog items.
pub struct CatalogRepo;

impl CatalogRepo {
    /// List every item of a kind, ordered by name.
    pub async fn list(pool: &PgPool, kind: ItemType) -> Result<Vec<CatalogItem>, sqlx::Error> {
        let table = kind.table_name();
        let query = format!("SELECT {COLUMNS} FROM {table} ORDER BY name ASC, id ASC");
        sqlx::query_as::<_, CatalogItem>(&query).fetch_all(pool).await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        kind: ItemType,
        id: DbId,
    ) -> Result<Option<CatalogItem>, sqlx::Error> {
        let table = kind.table_name();
        let query = format!("SELECT {COLUMNS} FROM {table} WHERE id = $1");
        sqlx::query_as::<_, CatalogItem>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new item, returning the created row.
    pub async fn create(
        pool: &PgPool,
        kind: ItemType,
        input: &CreateCatalogItem,
    ) -> Result<CatalogItem, sqlx::Error> {
        let table = kind.table_name();
        let query = format!(
            "INSERT INTO {table}
                (name, name_localized, usd, brl, compatible_models, countries, display_order)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 0))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CatalogItem>(&query)
            .bind(&input.name)
            .bind(&input.name_localized)
            .bind(input.usd)
            .bind(input.brl)
            .bind(&input.compatible_models)
            .bind(&input.countries)
            .bind(input.display_order)
            .fetch_one(pool)
            .await
    }

    /// Update an item. Returns the updated row, or `None` if not found.
    pub async fn update(
        pool: &PgPool,
        kind: ItemType,
        id: DbId,
        input: &UpdateCatalogItem,
    ) -> Result<Option<CatalogItem>, sqlx::Error> {
        let table = kind.table_name();
        let query = format!(
            "UPDATE {table} SET
                name = COALESCE($1, name),
                name_localized = COALESCE($2, name_localized),
                usd = COALESCE($3, usd),
                brl = COALESCE($4, brl),
                compatible_models = COALESCE($5, compatible_models),
                countries = COALESCE($6, countries),
                display_order = COALESCE($7, display_order)
             WHERE id = $8
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CatalogItem>(&query)
            .bind(&input.name)
            .bind(&input.name_localized)
            .bind(input.usd)
            .bind(input.brl)
            .bind(&input.compatible_models)
            .bind(&input.countries)
            .bind(input.display_order)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, kind: ItemType, id: DbId) -> Result<bool, sqlx::Error> {
        let table = kind.table_name();
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

//! Repository for the `dealers` table.

use dealerhub_core::catalog::ALL_COUNTRIES;
use dealerhub_core::types::DbId;
use sqlx::PgPool;

use crate::models::dealer::{CreateDealer, Dealer, UpdateDealer};

/// Column list for dealers queries.
const COLUMNS: &str = "id, name, email, country, is_active, created_at, updated_at";

/// Provides CRUD operations for dealers.
pub struct DealerRepo;

impl DealerRepo {
    /// Insert a new dealer, returning the created row.
    ///
    /// A missing country defaults to `"All"`.
    pub async fn create(pool: &PgPool, input: &CreateDealer) -> Result<Dealer, sqlx::Error> {
        let query = format!(
            "INSERT INTO dealers (name, email, country)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dealer>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(input.country.as_deref().unwrap_or(ALL_COUNTRIES))
            .fetch_one(pool)
            .await
    }

    /// Find a dealer by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Dealer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dealers WHERE id = $1");
        sqlx::query_as::<_, Dealer>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all dealers ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Dealer>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dealers ORDER BY name ASC, id ASC");
        sqlx::query_as::<_, Dealer>(&query).fetch_all(pool).await
    }

    /// Update a dealer. Returns the updated row, or `None` if not found.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDealer,
    ) -> Result<Option<Dealer>, sqlx::Error> {
        let query = format!(
            "UPDATE dealers SET
                name = COALESCE($1, name),
                email = COALESCE($2, email),
                country = COALESCE($3, country),
                is_active = COALESCE($4, is_active)
             WHERE id = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Dealer>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.country)
            .bind(input.is_active)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a dealer and, by cascade, its pricing rows.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dealers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

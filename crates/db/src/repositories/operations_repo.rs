//! Read-only listings for the operational tables in the admin aggregate.

use sqlx::PgPool;

use crate::models::operations::{FactoryProduction, MarketingAsset, Order, Quote, ServiceRequest};

const ORDER_COLUMNS: &str = "id, dealer_id, customer_name, boat_model, additional_options, \
    total_usd, total_brl, status, created_at, updated_at";

const SERVICE_REQUEST_COLUMNS: &str =
    "id, dealer_id, customer_name, hull_id, issues, status, created_at, updated_at";

const MARKETING_COLUMNS: &str = "id, title, url, boat_model, created_at, updated_at";

const FACTORY_COLUMNS: &str =
    "id, boat_model, hull_id, dealer_id, stage, expected_completion, created_at, updated_at";

/// Newest-first listings for orders, quotes, service requests, marketing
/// assets and factory production.
pub struct OperationsRepo;

impl OperationsRepo {
    pub async fn list_orders(pool: &PgPool) -> Result<Vec<Order>, sqlx::Error> {
        let query =
            format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Order>(&query).fetch_all(pool).await
    }

    pub async fn list_quotes(pool: &PgPool) -> Result<Vec<Quote>, sqlx::Error> {
        let query =
            format!("SELECT {ORDER_COLUMNS} FROM quotes ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Quote>(&query).fetch_all(pool).await
    }

    pub async fn list_service_requests(pool: &PgPool) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {SERVICE_REQUEST_COLUMNS} FROM service_requests
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ServiceRequest>(&query).fetch_all(pool).await
    }

    pub async fn list_marketing_content(pool: &PgPool) -> Result<Vec<MarketingAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {MARKETING_COLUMNS} FROM marketing_content ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, MarketingAsset>(&query).fetch_all(pool).await
    }

    pub async fn list_marketing_manuals(pool: &PgPool) -> Result<Vec<MarketingAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {MARKETING_COLUMNS} FROM marketing_manuals ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, MarketingAsset>(&query).fetch_all(pool).await
    }

    pub async fn list_factory_production(
        pool: &PgPool,
    ) -> Result<Vec<FactoryProduction>, sqlx::Error> {
        let query = format!(
            "SELECT {FACTORY_COLUMNS} FROM factory_production
             ORDER BY expected_completion ASC NULLS LAST, id ASC"
        );
        sqlx::query_as::<_, FactoryProduction>(&query).fetch_all(pool).await
    }
}

//! Handler for the admin aggregate read.
//!
//! Every collection is queried concurrently and independently: a failing
//! query is logged and its collection comes back empty rather than failing
//! the whole response. A degraded aggregate is served but never cached.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use dealerhub_core::catalog::ItemType;
use dealerhub_core::sync::{ADMIN_FORCE_PARAMS, HEADER_CACHE_STATUS};
use dealerhub_core::types::Timestamp;
use dealerhub_db::models::catalog::CatalogItem;
use dealerhub_db::models::dealer::Dealer;
use dealerhub_db::models::operations::{
    FactoryProduction, MarketingAsset, Order, Quote, ServiceRequest,
};
use dealerhub_db::repositories::{CatalogRepo, DealerRepo, OperationsRepo};
use dealerhub_db::DbPool;
use serde::Serialize;

use crate::cache::{CacheStatus, Lookup};
use crate::error::AppResult;
use crate::query::{has_any_flag, QueryMap};
use crate::response::{insert_header, no_store_headers, DataResponse};
use crate::state::AppState;

const CACHE_KEY: &str = "admin-data";

/// Everything the admin back office loads on start.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminData {
    pub boat_models: Vec<CatalogItem>,
    pub engine_packages: Vec<CatalogItem>,
    pub hull_colors: Vec<CatalogItem>,
    pub upholstery_packages: Vec<CatalogItem>,
    pub additional_options: Vec<CatalogItem>,
    pub dealers: Vec<Dealer>,
    pub orders: Vec<Order>,
    pub quotes: Vec<Quote>,
    pub service_requests: Vec<ServiceRequest>,
    pub marketing_content: Vec<MarketingAsset>,
    pub marketing_manuals: Vec<MarketingAsset>,
    pub factory_production: Vec<FactoryProduction>,
}

/// Result of [`load_admin_data`].
#[derive(Debug)]
pub struct AdminLoad {
    pub data: AdminData,
    /// Number of collections that came back empty because their query failed.
    pub failed: usize,
}

impl AdminLoad {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Await a collection query, degrading a failure to an empty list.
async fn or_empty<T, F>(collection: &'static str, failed: &AtomicUsize, query: F) -> Vec<T>
where
    F: Future<Output = Result<Vec<T>, sqlx::Error>>,
{
    match query.await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(collection, error = %e, "Admin collection query failed");
            failed.fetch_add(1, Ordering::Relaxed);
            Vec::new()
        }
    }
}

/// Load every admin collection concurrently.
pub async fn load_admin_data(pool: &DbPool) -> AdminLoad {
    let failed = AtomicUsize::new(0);
    let f = &failed;
    let (
        boat_models,
        engine_packages,
        hull_colors,
        upholstery_packages,
        additional_options,
        dealers,
        orders,
        quotes,
        service_requests,
        marketing_content,
        marketing_manuals,
        factory_production,
    ) = tokio::join!(
        or_empty("boat_models", f, CatalogRepo::list(pool, ItemType::BoatModel)),
        or_empty("engine_packages", f, CatalogRepo::list(pool, ItemType::EnginePackage)),
        or_empty("hull_colors", f, CatalogRepo::list(pool, ItemType::HullColor)),
        or_empty(
            "upholstery_packages",
            f,
            CatalogRepo::list(pool, ItemType::UpholsteryPackage)
        ),
        or_empty(
            "additional_options",
            f,
            CatalogRepo::list(pool, ItemType::AdditionalOption)
        ),
        or_empty("dealers", f, DealerRepo::list(pool)),
        or_empty("orders", f, OperationsRepo::list_orders(pool)),
        or_empty("quotes", f, OperationsRepo::list_quotes(pool)),
        or_empty("service_requests", f, OperationsRepo::list_service_requests(pool)),
        or_empty("marketing_content", f, OperationsRepo::list_marketing_content(pool)),
        or_empty("marketing_manuals", f, OperationsRepo::list_marketing_manuals(pool)),
        or_empty("factory_production", f, OperationsRepo::list_factory_production(pool)),
    );

    let data = AdminData {
        boat_models,
        engine_packages,
        hull_colors,
        upholstery_packages,
        additional_options,
        dealers,
        orders: orders.into_iter().map(Order::sanitized).collect(),
        quotes: quotes.into_iter().map(Quote::sanitized).collect(),
        service_requests: service_requests
            .into_iter()
            .map(ServiceRequest::sanitized)
            .collect(),
        marketing_content,
        marketing_manuals,
        factory_production,
    };
    AdminLoad {
        data,
        failed: failed.into_inner(),
    }
}

async fn load_and_store(state: &AppState, pool: &DbPool, latest: Option<Timestamp>) -> AdminData {
    let load = load_admin_data(pool).await;
    if load.is_complete() {
        state
            .admin_cache
            .store(CACHE_KEY, load.data.clone(), latest, state.config.cache.admin_ttl)
            .await;
    } else {
        tracing::warn!(failed = load.failed, "Admin aggregate degraded, not caching");
    }
    load.data
}

/// GET /api/v1/admin/data
pub async fn get_admin_data(
    State(state): State<AppState>,
    Query(params): Query<QueryMap>,
) -> AppResult<impl IntoResponse> {
    let pool = state.pool()?;
    let force = has_any_flag(&params, ADMIN_FORCE_PARAMS);
    let oracle = &state.admin_cache;

    let (data, status) = if force {
        let cleared = oracle.clear().await;
        tracing::info!(cleared, "Force refresh cleared admin cache");
        let latest = oracle.latest(pool).await;
        let data = load_and_store(&state, pool, latest).await;
        (data, CacheStatus::Bypass)
    } else {
        match oracle.lookup(pool, CACHE_KEY).await {
            Lookup::Hit(data) => (data, CacheStatus::Hit),
            Lookup::Miss { latest } => {
                let data = load_and_store(&state, pool, latest).await;
                (data, CacheStatus::Miss)
            }
        }
    };

    let mut headers = if force {
        no_store_headers()
    } else {
        HeaderMap::new()
    };
    insert_header(
        &mut headers,
        HEADER_CACHE_STATUS,
        HeaderValue::from_static(status.as_str()),
    );

    Ok((headers, Json(DataResponse { data })))
}

//! Handler for the resolved dealer configuration.
//!
//! Serves the five catalog collections with the requesting dealer's MSRP
//! overrides merged in, behind the dealer-config response cache.

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use dealerhub_core::catalog::{ItemType, ALL_COUNTRIES};
use dealerhub_core::pricing::{resolve_items, DealerConfig, PriceOverride};
use dealerhub_core::sync::{DEALER_CONFIG_FORCE_PARAMS, HEADER_CACHE_STATUS};
use dealerhub_core::types::{now_millis, DbId};
use dealerhub_db::models::catalog::CatalogItem;
use dealerhub_db::repositories::{CatalogRepo, DealerPricingRepo, DealerRepo};
use dealerhub_db::DbPool;

use crate::cache::{CacheStatus, Lookup};
use crate::error::AppResult;
use crate::query::{has_any_flag, is_pricing_update, optional_dealer_id, QueryMap};
use crate::response::{insert_header, no_store_headers, DataResponse};
use crate::state::AppState;

/// Cache key for a dealer (or the anonymous view).
pub fn cache_key(dealer_id: Option<DbId>) -> String {
    match dealer_id {
        Some(id) => format!("dealer-config:{id}"),
        None => "dealer-config:anonymous".to_string(),
    }
}

/// GET /api/v1/dealer-config?dealer_id=
pub async fn get_dealer_config(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryMap>,
) -> AppResult<impl IntoResponse> {
    let pool = state.pool()?;
    let dealer_id = optional_dealer_id(&params)?;
    let key = cache_key(dealer_id);

    let force = has_any_flag(&params, DEALER_CONFIG_FORCE_PARAMS);
    let pricing_update = is_pricing_update(
        &headers,
        &params,
        now_millis(),
        state.config.cache.pricing_marker_window.as_millis() as i64,
    );
    let ttl = if pricing_update {
        state.config.cache.pricing_update_ttl
    } else {
        state.config.cache.dealer_config_ttl
    };

    let oracle = &state.dealer_config_cache;
    let (config, status) = if force {
        let cleared = oracle.clear().await;
        tracing::info!(cleared, ?dealer_id, "Force refresh cleared dealer config cache");
        let latest = oracle.latest(pool).await;
        let config = build_dealer_config(pool, dealer_id).await?;
        oracle.store(&key, config.clone(), latest, ttl).await;
        (config, CacheStatus::Bypass)
    } else {
        match oracle.lookup(pool, &key).await {
            Lookup::Hit(config) => (config, CacheStatus::Hit),
            Lookup::Miss { latest } => {
                let config = build_dealer_config(pool, dealer_id).await?;
                oracle.store(&key, config.clone(), latest, ttl).await;
                (config, CacheStatus::Miss)
            }
        }
    };

    tracing::debug!(
        ?dealer_id,
        cache = status.as_str(),
        pricing_count = config.dealer_pricing_count,
        "Dealer config served"
    );

    let mut response_headers = if force || pricing_update {
        no_store_headers()
    } else {
        HeaderMap::new()
    };
    insert_header(
        &mut response_headers,
        HEADER_CACHE_STATUS,
        HeaderValue::from_static(status.as_str()),
    );

    Ok((response_headers, Json(DataResponse { data: config })))
}

/// Load and resolve the catalog for one dealer.
///
/// An unknown or absent dealer sees country `"All"` and no overrides. Any
/// failed catalog query fails the whole request.
pub async fn build_dealer_config(
    pool: &DbPool,
    dealer_id: Option<DbId>,
) -> AppResult<DealerConfig<CatalogItem>> {
    let dealer = match dealer_id {
        Some(id) => DealerRepo::find_by_id(pool, id).await?,
        None => None,
    };
    let dealer_country = dealer
        .as_ref()
        .map(|d| d.country.clone())
        .unwrap_or_else(|| ALL_COUNTRIES.to_string());

    let overrides: Vec<PriceOverride> = match &dealer {
        Some(d) => DealerPricingRepo::list_by_dealer(pool, d.id)
            .await?
            .iter()
            .map(|row| row.to_override())
            .collect(),
        None => Vec::new(),
    };

    let (boat_models, engine_packages, hull_colors, upholstery_packages, additional_options) =
        tokio::try_join!(
            CatalogRepo::list(pool, ItemType::BoatModel),
            CatalogRepo::list(pool, ItemType::EnginePackage),
            CatalogRepo::list(pool, ItemType::HullColor),
            CatalogRepo::list(pool, ItemType::UpholsteryPackage),
            CatalogRepo::list(pool, ItemType::AdditionalOption),
        )?;

    let resolve = |items: &[CatalogItem], kind: ItemType| {
        resolve_items(items, kind, &overrides, &dealer_country)
    };

    Ok(DealerConfig {
        boat_models: resolve(&boat_models, ItemType::BoatModel),
        engine_packages: resolve(&engine_packages, ItemType::EnginePackage),
        hull_colors: resolve(&hull_colors, ItemType::HullColor),
        upholstery_packages: resolve(&upholstery_packages, ItemType::UpholsteryPackage),
        additional_options: resolve(&additional_options, ItemType::AdditionalOption),
        dealer_pricing_count: overrides.len(),
        dealer_country,
    })
}

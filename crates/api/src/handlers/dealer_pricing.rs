//! Handlers for dealer MSRP overrides.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use dealerhub_core::pricing::{validate_pricing_input, PricingInput, SyncMetadata};
use dealerhub_core::sync::{HEADER_PRICING_UPDATE, HEADER_SYNC_TIMESTAMP};
use dealerhub_core::types::{now_millis, DbId};
use dealerhub_db::models::dealer_pricing::DealerPricing;
use dealerhub_db::repositories::{DealerPricingRepo, DealerRepo};
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::handlers::dealer_config::cache_key;
use crate::query::{parse_dealer_id, DealerIdParams};
use crate::response::{insert_header, no_store_headers, DataResponse};
use crate::state::AppState;

/// Response body of a pricing write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingWriteResponse {
    pub data: DealerPricing,
    pub sync_metadata: SyncMetadata,
}

/// POST /api/v1/dealer-pricing
///
/// Validates, rounds and upserts one override keyed on
/// `(dealer_id, item_type, item_id)`. The body is taken as raw JSON so that
/// wrongly typed fields surface as 400 validation errors.
pub async fn upsert(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let pool = state.pool()?;

    let input: PricingInput = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid pricing payload: {e}")))?;
    let pricing = validate_pricing_input(&input)?;

    if DealerRepo::find_by_id(pool, pricing.dealer_id).await?.is_none() {
        return Err(AppError::not_found("Dealer", pricing.dealer_id));
    }

    let row = DealerPricingRepo::upsert(pool, &pricing).await?;
    let timestamp = now_millis();
    let sync_metadata = SyncMetadata::from_validated(&pricing, timestamp);

    state
        .dealer_config_cache
        .invalidate(&cache_key(Some(pricing.dealer_id)))
        .await;

    tracing::info!(
        dealer_id = pricing.dealer_id,
        item_type = %pricing.item_type,
        item_id = %pricing.item_id,
        sale_price_usd = pricing.sale_price_usd,
        sale_price_brl = pricing.sale_price_brl,
        "Dealer pricing saved"
    );

    let mut headers = no_store_headers();
    insert_header(&mut headers, HEADER_PRICING_UPDATE, HeaderValue::from_static("true"));
    insert_header(
        &mut headers,
        HEADER_SYNC_TIMESTAMP,
        HeaderValue::from(timestamp),
    );

    Ok((
        StatusCode::OK,
        headers,
        Json(PricingWriteResponse {
            data: row,
            sync_metadata,
        }),
    ))
}

/// GET /api/v1/dealer-pricing?dealer_id=
pub async fn list_by_dealer(
    State(state): State<AppState>,
    Query(params): Query<DealerIdParams>,
) -> AppResult<impl IntoResponse> {
    let pool = state.pool()?;
    let dealer_id = parse_dealer_id(&params.dealer_id)?;
    let rows = DealerPricingRepo::list_by_dealer(pool, dealer_id).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// DELETE /api/v1/dealer-pricing/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let pool = state.pool()?;
    let row = DealerPricingRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("DealerPricing", id))?;

    DealerPricingRepo::delete(pool, id).await?;
    state
        .dealer_config_cache
        .invalidate(&cache_key(Some(row.dealer_id)))
        .await;

    tracing::info!(id, dealer_id = row.dealer_id, "Dealer pricing deleted");
    Ok(StatusCode::NO_CONTENT)
}

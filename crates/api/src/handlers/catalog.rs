//! Handlers for `/admin/catalog/{item_type}`.
//!
//! `item_type` accepts either the singular kind (`engine_package`) or the
//! table name (`engine_packages`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use dealerhub_core::catalog::ItemType;
use dealerhub_core::money::{validate_amount, MAX_PRICE};
use dealerhub_core::types::DbId;
use dealerhub_db::models::catalog::{CreateCatalogItem, UpdateCatalogItem};
use dealerhub_db::repositories::CatalogRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

const ENTITY: &str = "CatalogItem";

fn parse_kind(raw: &str) -> AppResult<ItemType> {
    Ok(ItemType::from_str_value(raw)?)
}

/// GET /api/v1/admin/catalog/{item_type}
pub async fn list(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
) -> AppResult<impl IntoResponse> {
    let pool = state.pool()?;
    let kind = parse_kind(&item_type)?;
    let items = CatalogRepo::list(pool, kind).await?;
    Ok(Json(DataResponse { data: items }))
}

/// GET /api/v1/admin/catalog/{item_type}/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path((item_type, id)): Path<(String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let pool = state.pool()?;
    let kind = parse_kind(&item_type)?;
    let item = CatalogRepo::find_by_id(pool, kind, id)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))?;
    Ok(Json(DataResponse { data: item }))
}

/// POST /api/v1/admin/catalog/{item_type}
pub async fn create(
    State(state): State<AppState>,
    Path(item_type): Path<String>,
    Json(mut input): Json<CreateCatalogItem>,
) -> AppResult<impl IntoResponse> {
    let pool = state.pool()?;
    let kind = parse_kind(&item_type)?;

    input.name = input.name.trim().to_string();
    if input.name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    input.usd = validate_amount(input.usd, "usd", MAX_PRICE)?;
    input.brl = validate_amount(input.brl, "brl", MAX_PRICE)?;

    let item = CatalogRepo::create(pool, kind, &input).await?;
    tracing::info!(item_type = %kind, id = item.id, "Catalog item created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: item })))
}

/// PUT /api/v1/admin/catalog/{item_type}/{id}
pub async fn update(
    State(state): State<AppState>,
    Path((item_type, id)): Path<(String, DbId)>,
    Json(mut input): Json<UpdateCatalogItem>,
) -> AppResult<impl IntoResponse> {
    let pool = state.pool()?;
    let kind = parse_kind(&item_type)?;

    if let Some(usd) = input.usd {
        input.usd = Some(validate_amount(usd, "usd", MAX_PRICE)?);
    }
    if let Some(brl) = input.brl {
        input.brl = Some(validate_amount(brl, "brl", MAX_PRICE)?);
    }

    let item = CatalogRepo::update(pool, kind, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, id))?;
    tracing::info!(item_type = %kind, id, "Catalog item updated");
    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/v1/admin/catalog/{item_type}/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path((item_type, id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    let pool = state.pool()?;
    let kind = parse_kind(&item_type)?;
    if CatalogRepo::delete(pool, kind, id).await? {
        tracing::info!(item_type = %kind, id, "Catalog item deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(ENTITY, id))
    }
}

//! Handlers for `/admin/dealers`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use dealerhub_core::types::DbId;
use dealerhub_db::models::dealer::{CreateDealer, UpdateDealer};
use dealerhub_db::repositories::DealerRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/admin/dealers
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let dealers = DealerRepo::list(state.pool()?).await?;
    Ok(Json(DataResponse { data: dealers }))
}

/// GET /api/v1/admin/dealers/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let dealer = DealerRepo::find_by_id(state.pool()?, id)
        .await?
        .ok_or_else(|| AppError::not_found("Dealer", id))?;
    Ok(Json(DataResponse { data: dealer }))
}

/// POST /api/v1/admin/dealers
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateDealer>,
) -> AppResult<impl IntoResponse> {
    let pool = state.pool()?;
    if input.name.trim().is_empty() || input.email.trim().is_empty() {
        return Err(AppError::BadRequest(
            "name and email are required".to_string(),
        ));
    }
    let dealer = DealerRepo::create(pool, &input).await?;
    tracing::info!(id = dealer.id, country = %dealer.country, "Dealer created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: dealer })))
}

/// PUT /api/v1/admin/dealers/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDealer>,
) -> AppResult<impl IntoResponse> {
    let dealer = DealerRepo::update(state.pool()?, id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("Dealer", id))?;
    Ok(Json(DataResponse { data: dealer }))
}

/// DELETE /api/v1/admin/dealers/{id}
///
/// Also removes the dealer's pricing overrides (foreign key cascade).
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if DealerRepo::delete(state.pool()?, id).await? {
        tracing::info!(id, "Dealer deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Dealer", id))
    }
}

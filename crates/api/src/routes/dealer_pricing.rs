use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::dealer_pricing;
use crate::state::AppState;

/// Routes mounted at `/dealer-pricing`.
///
/// ```text
/// GET    /          -> list_by_dealer (?dealer_id=)
/// POST   /          -> upsert
/// DELETE /{id}      -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(dealer_pricing::list_by_dealer).post(dealer_pricing::upsert),
        )
        .route("/{id}", delete(dealer_pricing::delete))
}

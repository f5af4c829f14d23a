use axum::routing::get;
use axum::Router;

use crate::handlers::dealer_config;
use crate::state::AppState;

/// Routes mounted at `/dealer-config`.
///
/// ```text
/// GET    /          -> get_dealer_config
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dealer_config::get_dealer_config))
}

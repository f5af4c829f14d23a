pub mod admin;
pub mod dealer_config;
pub mod dealer_pricing;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                      WebSocket change feed
///
/// /dealer-config                           resolved dealer config (GET)
///
/// /dealer-pricing                          list (GET ?dealer_id=), upsert (POST)
/// /dealer-pricing/{id}                     delete
///
/// /admin/data                              admin aggregate (GET)
/// /admin/catalog/{item_type}               list, create
/// /admin/catalog/{item_type}/{id}          get, update, delete
/// /admin/dealers                           list, create
/// /admin/dealers/{id}                      get, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/dealer-config", dealer_config::router())
        .nest("/dealer-pricing", dealer_pricing::router())
        .nest("/admin", admin::router())
}

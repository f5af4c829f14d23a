//! Route definitions for the admin back office.

use axum::routing::get;
use axum::Router;

use crate::handlers::{admin_data, catalog, dealers};
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /data                          -> get_admin_data
///
/// GET    /catalog/{item_type}           -> list
/// POST   /catalog/{item_type}           -> create
/// GET    /catalog/{item_type}/{id}      -> get_by_id
/// PUT    /catalog/{item_type}/{id}      -> update
/// DELETE /catalog/{item_type}/{id}      -> delete
///
/// GET    /dealers                       -> list
/// POST   /dealers                       -> create
/// GET    /dealers/{id}                  -> get_by_id
/// PUT    /dealers/{id}                  -> update
/// DELETE /dealers/{id}                  -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/data", get(admin_data::get_admin_data))
        .route(
            "/catalog/{item_type}",
            get(catalog::list).post(catalog::create),
        )
        .route(
            "/catalog/{item_type}/{id}",
            get(catalog::get_by_id)
                .put(catalog::update)
                .delete(catalog::delete),
        )
        .route("/dealers", get(dealers::list).post(dealers::create))
        .route(
            "/dealers/{id}",
            get(dealers::get_by_id)
                .put(dealers::update)
                .delete(dealers::delete),
        )
}

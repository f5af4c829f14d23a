//! Shared query parameter helpers for API handlers.
//!
//! Cache-control flags are presence-only (`?refresh`, `?cb=123`), so these
//! endpoints take the raw query map rather than a typed struct.

use std::collections::HashMap;

use axum::http::HeaderMap;
use dealerhub_core::sync::{is_recent_marker, HEADER_PRICING_MARKER, HEADER_PRICING_UPDATE};
use dealerhub_core::types::{DbId, EpochMillis};
use serde::Deserialize;

use crate::error::AppError;

/// Raw query parameters.
pub type QueryMap = HashMap<String, String>;

/// `?dealer_id=` as used by the pricing list endpoint.
#[derive(Debug, Deserialize)]
pub struct DealerIdParams {
    pub dealer_id: String,
}

/// Whether any of `flags` is present in the query string.
pub fn has_any_flag(params: &QueryMap, flags: &[&str]) -> bool {
    flags.iter().any(|flag| params.contains_key(*flag))
}

/// Parse an optional dealer id. Blank counts as absent.
pub fn optional_dealer_id(params: &QueryMap) -> Result<Option<DbId>, AppError> {
    match params.get("dealer_id").map(|s| s.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => parse_dealer_id(raw).map(Some),
    }
}

pub fn parse_dealer_id(raw: &str) -> Result<DbId, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("dealer_id '{raw}' is not a valid id")))
}

/// Whether the request follows a pricing write.
///
/// Flagged by `x-pricing-update: true`, the `msrp_update` query flag, or an
/// `x-pricing-update-marker` header no older than `marker_window_ms`.
pub fn is_pricing_update(
    headers: &HeaderMap,
    params: &QueryMap,
    now: EpochMillis,
    marker_window_ms: i64,
) -> bool {
    let header_flag = headers
        .get(HEADER_PRICING_UPDATE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

    let recent_marker = headers
        .get(HEADER_PRICING_MARKER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<EpochMillis>().ok())
        .is_some_and(|marker| is_recent_marker(marker, now, marker_window_ms));

    header_flag || params.contains_key("msrp_update") || recent_marker
}

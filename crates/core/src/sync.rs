//! Wire types and names shared by the server and the client sync bus.
//!
//! Covers the realtime change notices pushed over the websocket, the
//! cross-tab storage marker, and the header/query names used to flag
//! pricing updates and forced refreshes.

use serde::{Deserialize, Serialize};

use crate::types::EpochMillis;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Postgres `NOTIFY` channel carrying row changes.
pub const CHANGE_CHANNEL: &str = "table_changes";

/// Storage key holding the last dealer pricing write marker.
pub const DEALER_PRICING_MARKER_KEY: &str = "dealerPricingLastUpdate";

/// Request/response header flagging a pricing update.
pub const HEADER_PRICING_UPDATE: &str = "x-pricing-update";
/// Request header carrying the client's last pricing marker timestamp.
pub const HEADER_PRICING_MARKER: &str = "x-pricing-update-marker";
/// Response header restating the server-side write timestamp.
pub const HEADER_SYNC_TIMESTAMP: &str = "x-sync-timestamp";
/// Response header reporting `HIT`, `MISS` or `BYPASS`.
pub const HEADER_CACHE_STATUS: &str = "x-cache";

/// Query parameters that force a fresh dealer config read. Presence alone
/// counts, whatever the value.
pub const DEALER_CONFIG_FORCE_PARAMS: &[&str] = &[
    "refresh",
    "force",
    "cb",
    "t",
    "invalidate_cache",
    "clear_cache",
    "msrp_update",
];

/// Query parameters that force a fresh admin aggregate read.
pub const ADMIN_FORCE_PARAMS: &[&str] = &["refresh", "clear_cache"];

/// Catalog tables plus pricing and dealers: everything a dealer config
/// response is built from.
pub const DEALER_CONFIG_TABLES: &[&str] = &[
    "boat_models",
    "engine_packages",
    "hull_colors",
    "upholstery_packages",
    "additional_options",
    "dealer_pricing",
    "dealers",
];

/// Catalog tables only.
pub const CATALOG_TABLES: &[&str] = &[
    "boat_models",
    "engine_packages",
    "hull_colors",
    "upholstery_packages",
    "additional_options",
];

/// Every table included in the admin aggregate.
pub const ADMIN_DATA_TABLES: &[&str] = &[
    "boat_models",
    "engine_packages",
    "hull_colors",
    "upholstery_packages",
    "additional_options",
    "dealers",
    "orders",
    "quotes",
    "service_requests",
    "marketing_content",
    "marketing_manuals",
    "factory_production",
];

// ---------------------------------------------------------------------------
// Realtime change notices
// ---------------------------------------------------------------------------

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// One row change, as emitted by the `notify_table_change()` trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotice {
    pub table: String,
    pub action: ChangeAction,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub dealer_id: Option<String>,
    /// Commit time in epoch milliseconds.
    pub timestamp: EpochMillis,
}

/// Messages a websocket client sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving changes for `tables`. An empty list means all tables.
    Subscribe { tables: Vec<String> },
    Unsubscribe { tables: Vec<String> },
}

/// Messages the server pushes to websocket clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Subscribed { tables: Vec<String> },
    Change(ChangeNotice),
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Cross-tab marker
// ---------------------------------------------------------------------------

/// Value written under [`DEALER_PRICING_MARKER_KEY`] after a pricing write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageMarker {
    pub timestamp: EpochMillis,
    #[serde(default)]
    pub dealer_id: Option<String>,
}

impl StorageMarker {
    /// Parse a stored marker, returning `None` for malformed values.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Whether a pricing marker sent by a client is recent enough to treat
/// the request as following a pricing write.
pub fn is_recent_marker(marker: EpochMillis, now: EpochMillis, window_ms: i64) -> bool {
    marker <= now && now - marker <= window_ms
}

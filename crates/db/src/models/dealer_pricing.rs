//! Dealer MSRP overrides.

use dealerhub_core::pricing::PriceOverride;
use dealerhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `dealer_pricing` table.
///
/// Unique on `(dealer_id, item_type, item_id)`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DealerPricing {
    pub id: DbId,
    pub dealer_id: DbId,
    pub item_type: String,
    pub item_id: String,
    pub item_name: String,
    pub sale_price_usd: f64,
    pub sale_price_brl: f64,
    pub margin_percentage: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DealerPricing {
    /// The fields the resolver matches and applies.
    pub fn to_override(&self) -> PriceOverride {
        PriceOverride {
            item_type: self.item_type.clone(),
            item_id: self.item_id.clone(),
            sale_price_usd: self.sale_price_usd,
            sale_price_brl: self.sale_price_brl,
            margin_percentage: self.margin_percentage,
        }
    }
}

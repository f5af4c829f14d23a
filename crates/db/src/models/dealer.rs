//! Dealer accounts.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use dealerhub_core::types::{DbId, Timestamp};

/// A row from the `dealers` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Dealer {
    pub id: DbId,
    pub name: String,
    pub email: String,
    /// ISO-style country code, or `"All"` when unrestricted.
    pub country: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a dealer.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDealer {
    pub name: String,
    pub email: String,
    pub country: Option<String>,
}

/// DTO for partially updating a dealer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDealer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub is_active: Option<bool>,
}

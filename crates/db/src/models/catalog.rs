//! Catalog items: boat models, engine packages, hull colors, upholstery
//! packages and additional options.
//!
//! All five tables share this row shape; the table is picked from an
//! [`ItemType`](dealerhub_core::catalog::ItemType) at query time.

use dealerhub_core::pricing::CatalogEntry;
use dealerhub_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from any of the catalog tables.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: DbId,
    pub name: String,
    pub name_localized: Option<String>,
    /// Factory cost in USD.
    pub usd: f64,
    /// Factory cost in BRL.
    pub brl: f64,
    pub compatible_models: Option<Vec<String>>,
    pub countries: Option<Vec<String>>,
    pub display_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CatalogEntry for CatalogItem {
    fn item_id(&self) -> String {
        self.id.to_string()
    }

    fn cost_usd(&self) -> f64 {
        self.usd
    }

    fn cost_brl(&self) -> f64 {
        self.brl
    }

    fn countries(&self) -> Option<&[String]> {
        self.countries.as_deref()
    }
}

/// DTO for creating a catalog item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCatalogItem {
    pub name: String,
    pub name_localized: Option<String>,
    pub usd: f64,
    pub brl: f64,
    pub compatible_models: Option<Vec<String>>,
    pub countries: Option<Vec<String>>,
    pub display_order: Option<i32>,
}

/// DTO for partially updating a catalog item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCatalogItem {
    pub name: Option<String>,
    pub name_localized: Option<String>,
    pub usd: Option<f64>,
    pub brl: Option<f64>,
    pub compatible_models: Option<Vec<String>>,
    pub countries: Option<Vec<String>>,
    pub display_order: Option<i32>,
}

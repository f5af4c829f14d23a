//! Operational rows surfaced in the admin aggregate: orders, quotes,
//! service requests, marketing assets and factory production.
//!
//! These are read-only from this service's point of view.

use chrono::NaiveDate;
use dealerhub_core::sanitize::json_array;
use dealerhub_core::types::{DbId, Timestamp};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

/// A row from the `orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    pub dealer_id: Option<DbId>,
    pub customer_name: String,
    pub boat_model: String,
    pub additional_options: Option<Value>,
    pub total_usd: f64,
    pub total_brl: f64,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Coerce `additional_options` into a JSON array.
    pub fn sanitized(mut self) -> Self {
        self.additional_options = Some(Value::Array(json_array(self.additional_options.as_ref())));
        self
    }
}

/// A row from the `quotes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Quote {
    pub id: DbId,
    pub dealer_id: Option<DbId>,
    pub customer_name: String,
    pub boat_model: String,
    pub additional_options: Option<Value>,
    pub total_usd: f64,
    pub total_brl: f64,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Quote {
    /// Coerce `additional_options` into a JSON array.
    pub fn sanitized(mut self) -> Self {
        self.additional_options = Some(Value::Array(json_array(self.additional_options.as_ref())));
        self
    }
}

/// A row from the `service_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ServiceRequest {
    pub id: DbId,
    pub dealer_id: Option<DbId>,
    pub customer_name: String,
    pub hull_id: Option<String>,
    pub issues: Option<Value>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ServiceRequest {
    /// Coerce `issues` into a JSON array.
    pub fn sanitized(mut self) -> Self {
        self.issues = Some(Value::Array(json_array(self.issues.as_ref())));
        self
    }
}

/// A row from `marketing_content` or `marketing_manuals`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MarketingAsset {
    pub id: DbId,
    pub title: String,
    pub url: String,
    pub boat_model: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `factory_production` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FactoryProduction {
    pub id: DbId,
    pub boat_model: String,
    pub hull_id: Option<String>,
    pub dealer_id: Option<DbId>,
    pub stage: String,
    pub expected_completion: Option<NaiveDate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

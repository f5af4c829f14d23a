//! HTTP clients for the endpoints a bus re-fetches, and the pricing write.
//!
//! Wraps the API with [`reqwest`]. Each read client implements
//! [`Fetcher`] so it can be handed straight to a bus.

use async_trait::async_trait;
use dealerhub_core::pricing::{DealerConfig, SyncMetadata};
use dealerhub_core::sync::{HEADER_PRICING_MARKER, HEADER_PRICING_UPDATE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bus::Fetcher;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::signal::Signal;

/// Dealer configuration as decoded on the client. Catalog fields are kept
/// as raw JSON next to the resolved prices.
pub type ClientDealerConfig = DealerConfig<Value>;

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Human-readable message of an error response body.
///
/// Uses the `error` field of `{ "error": ..., "code": ... }` when present,
/// the raw body otherwise.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Shared HTTP plumbing.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: SyncConfig,
}

impl ApiClient {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(http: reqwest::Client, config: SyncConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        self.config.api_url(path)
    }

    async fn ensure_success(response: reqwest::Response) -> SyncResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> SyncResult<T> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| SyncError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Dealer config
// ---------------------------------------------------------------------------

/// Reads `GET /dealer-config` for one dealer.
#[derive(Clone)]
pub struct DealerConfigClient {
    api: ApiClient,
    dealer_id: Option<String>,
}

impl DealerConfigClient {
    pub fn new(api: ApiClient, dealer_id: Option<String>) -> Self {
        Self { api, dealer_id }
    }

    /// Fetch the resolved configuration.
    ///
    /// The signal's timestamp travels as the pricing marker so the server can
    /// shorten its cache TTL right after a write; an immediate signal forces
    /// a refresh.
    pub async fn get(&self, signal: Option<&Signal>) -> SyncResult<ClientDealerConfig> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(dealer_id) = &self.dealer_id {
            query.push(("dealer_id", dealer_id.clone()));
        }

        let mut request = self.api.http.get(self.api.url("/dealer-config"));
        if let Some(signal) = signal {
            request = request.header(HEADER_PRICING_MARKER, signal.timestamp.to_string());
            if signal.immediate {
                request = request.header(HEADER_PRICING_UPDATE, "true");
                query.push(("refresh", "true".to_string()));
            }
        }

        let response = request.query(&query).send().await?;
        let envelope: DataEnvelope<ClientDealerConfig> = ApiClient::decode(response).await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl Fetcher for DealerConfigClient {
    type Output = ClientDealerConfig;

    async fn fetch(&self, signal: &Signal) -> SyncResult<ClientDealerConfig> {
        self.get(Some(signal)).await
    }
}

// ---------------------------------------------------------------------------
// Admin aggregate
// ---------------------------------------------------------------------------

/// Reads `GET /admin/data`.
#[derive(Clone)]
pub struct AdminDataClient {
    api: ApiClient,
}

impl AdminDataClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get(&self, refresh: bool) -> SyncResult<Value> {
        let mut request = self.api.http.get(self.api.url("/admin/data"));
        if refresh {
            request = request.query(&[("refresh", "true")]);
        }
        let response = request.send().await?;
        let envelope: DataEnvelope<Value> = ApiClient::decode(response).await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl Fetcher for AdminDataClient {
    type Output = Value;

    async fn fetch(&self, signal: &Signal) -> SyncResult<Value> {
        self.get(signal.immediate).await
    }
}

// ---------------------------------------------------------------------------
// Pricing write
// ---------------------------------------------------------------------------

/// Body of `POST /dealer-pricing`.
#[derive(Debug, Clone, Serialize)]
pub struct PricingWrite {
    pub dealer_id: String,
    pub item_type: String,
    pub item_id: String,
    pub item_name: String,
    pub sale_price_usd: f64,
    pub sale_price_brl: f64,
    pub margin_percentage: f64,
}

/// Response of a successful pricing write.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSaved {
    pub data: Value,
    pub sync_metadata: SyncMetadata,
}

#[derive(Clone)]
pub struct PricingClient {
    api: ApiClient,
}

impl PricingClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Upsert an override. Validation failures come back as
    /// [`SyncError::Status`] carrying the server's message.
    pub async fn save(&self, write: &PricingWrite) -> SyncResult<PricingSaved> {
        let response = self
            .api
            .http
            .post(self.api.url("/dealer-pricing"))
            .header(HEADER_PRICING_UPDATE, "true")
            .json(write)
            .send()
            .await?;
        ApiClient::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_prefers_error_field() {
        let body = json!({"error": "sale_price_usd must be between 0 and 99999999.99", "code": "VALIDATION_ERROR"});
        assert_eq!(
            error_message(&body.to_string()),
            "sale_price_usd must be between 0 and 99999999.99"
        );
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(r#"{"message":"x"}"#), r#"{"message":"x"}"#);
    }

    #[test]
    fn dealer_config_envelope_decodes() {
        let body = json!({
            "data": {
                "boatModels": [{
                    "id": 7,
                    "name": "Tour 28",
                    "usd": 50000.0,
                    "brl": 250000.0,
                    "cost_usd": 50000.0,
                    "cost_brl": 250000.0,
                    "sale_price_usd": 55000.0,
                    "sale_price_brl": 275000.0,
                    "margin_percentage": 10.0,
                    "dealer_configured": true
                }],
                "enginePackages": [],
                "hullColors": [],
                "upholsteryPackages": [],
                "additionalOptions": [],
                "dealerCountry": "BR",
                "dealerPricingCount": 1
            }
        });
        let envelope: DataEnvelope<ClientDealerConfig> = serde_json::from_value(body).unwrap();
        let boat = &envelope.data.boat_models[0];
        assert_eq!(boat.sale_price_brl, 275000.0);
        assert_eq!(boat.cost_brl, 250000.0);
        assert_eq!(boat.item["name"], "Tour 28");
        assert_eq!(envelope.data.dealer_country, "BR");
    }

    #[test]
    fn pricing_saved_decodes_sync_metadata() {
        let body = json!({
            "data": {"id": 1},
            "syncMetadata": {
                "dealerId": "4",
                "itemType": "boat_model",
                "itemId": "7",
                "itemName": "Tour 28",
                "salePriceUsd": 55000.0,
                "salePriceBrl": 275000.0,
                "marginPercentage": 10.0,
                "timestamp": 1700000000000_i64
            }
        });
        let saved: PricingSaved = serde_json::from_value(body).unwrap();
        assert_eq!(saved.sync_metadata.dealer_id, "4");
        assert_eq!(saved.sync_metadata.timestamp, 1_700_000_000_000);
    }
}

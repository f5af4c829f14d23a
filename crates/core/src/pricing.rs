//! Dealer MSRP overrides: input validation and catalog resolution.
//!
//! A catalog item carries the factory cost (what the dealer pays). A dealer
//! may store an override carrying the MSRP they charge their own customers.
//! The two are never mixed: resolution always echoes the catalog cost and
//! only the `sale_price_*` fields come from the override.
//!
//! Everything here is pure; the caller loads catalog rows and overrides.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{is_visible_in_country, ItemType};
use crate::error::CoreError;
use crate::money::{validate_amount, MAX_MARGIN_PERCENTAGE, MAX_PRICE};
use crate::types::{DbId, EpochMillis};

// ---------------------------------------------------------------------------
// Input validation
// ---------------------------------------------------------------------------

/// Raw pricing write payload as received over HTTP.
///
/// Ids are kept as JSON values because clients send them as either strings
/// or numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricingInput {
    #[serde(default)]
    pub dealer_id: Value,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub item_id: Value,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub sale_price_usd: Option<f64>,
    #[serde(default)]
    pub sale_price_brl: Option<f64>,
    #[serde(default)]
    pub margin_percentage: Option<f64>,
}

/// A pricing write that passed validation, with amounts rounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedPricing {
    pub dealer_id: DbId,
    pub item_type: ItemType,
    pub item_id: String,
    pub item_name: String,
    pub sale_price_usd: f64,
    pub sale_price_brl: f64,
    pub margin_percentage: f64,
}

/// Coerce a JSON id (string or number) into its trimmed string form.
///
/// Returns `None` for null, empty strings and non-scalar values.
pub fn coerce_id(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn required_text(value: Option<&str>, field: &str) -> Result<String, CoreError> {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(CoreError::Validation(format!("{field} is required"))),
    }
}

/// Validate a pricing write.
///
/// `dealer_id`, `item_type` and `item_name` must be non-empty after trimming;
/// `item_id` must be non-empty after string coercion. Prices must lie in
/// `[0, MAX_PRICE]` and the margin in `[0, MAX_MARGIN_PERCENTAGE]`; missing
/// amounts count as zero. All amounts are rounded to 2 decimals.
pub fn validate_pricing_input(input: &PricingInput) -> Result<ValidatedPricing, CoreError> {
    let dealer_id_raw = coerce_id(&input.dealer_id)
        .ok_or_else(|| CoreError::Validation("dealer_id is required".to_string()))?;
    let item_type_raw = required_text(input.item_type.as_deref(), "item_type")?;
    let item_id = coerce_id(&input.item_id)
        .ok_or_else(|| CoreError::Validation("item_id is required".to_string()))?;
    let item_name = required_text(input.item_name.as_deref(), "item_name")?;

    let dealer_id: DbId = dealer_id_raw.parse().map_err(|_| {
        CoreError::Validation(format!("dealer_id '{dealer_id_raw}' is not a valid id"))
    })?;
    let item_type = ItemType::from_str_value(&item_type_raw)?;

    let sale_price_usd = validate_amount(
        input.sale_price_usd.unwrap_or(0.0),
        "sale_price_usd",
        MAX_PRICE,
    )?;
    let sale_price_brl = validate_amount(
        input.sale_price_brl.unwrap_or(0.0),
        "sale_price_brl",
        MAX_PRICE,
    )?;
    let margin_percentage = validate_amount(
        input.margin_percentage.unwrap_or(0.0),
        "margin_percentage",
        MAX_MARGIN_PERCENTAGE,
    )?;

    Ok(ValidatedPricing {
        dealer_id,
        item_type,
        item_id,
        item_name,
        sale_price_usd,
        sale_price_brl,
        margin_percentage,
    })
}

/// Restatement of a pricing write returned alongside the stored row so
/// clients can broadcast it to other tabs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub dealer_id: String,
    pub item_type: String,
    pub item_id: String,
    pub item_name: String,
    pub sale_price_usd: f64,
    pub sale_price_brl: f64,
    pub margin_percentage: f64,
    pub timestamp: EpochMillis,
}

impl SyncMetadata {
    pub fn from_validated(pricing: &ValidatedPricing, timestamp: EpochMillis) -> Self {
        Self {
            dealer_id: pricing.dealer_id.to_string(),
            item_type: pricing.item_type.as_str().to_string(),
            item_id: pricing.item_id.clone(),
            item_name: pricing.item_name.clone(),
            sale_price_usd: pricing.sale_price_usd,
            sale_price_brl: pricing.sale_price_brl,
            margin_percentage: pricing.margin_percentage,
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Read access to the fields of a catalog row that resolution needs.
pub trait CatalogEntry {
    /// The item's id in string form, as stored in `dealer_pricing.item_id`.
    fn item_id(&self) -> String;
    fn cost_usd(&self) -> f64;
    fn cost_brl(&self) -> f64;
    /// Countries the item is sold in, if restricted.
    fn countries(&self) -> Option<&[String]>;
}

/// The subset of a stored override used during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOverride {
    pub item_type: String,
    pub item_id: String,
    pub sale_price_usd: f64,
    pub sale_price_brl: f64,
    pub margin_percentage: f64,
}

/// A catalog row merged with the requesting dealer's override, if any.
///
/// Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedItem<T> {
    #[serde(flatten)]
    pub item: T,
    pub cost_usd: f64,
    pub cost_brl: f64,
    pub sale_price_usd: f64,
    pub sale_price_brl: f64,
    pub margin_percentage: Option<f64>,
    pub dealer_configured: bool,
}

/// Find the override for `(item_type, item_id)`.
///
/// `overrides` is expected newest first, so the first match is the freshest
/// should duplicates ever exist.
pub fn find_override<'a>(
    overrides: &'a [PriceOverride],
    item_type: ItemType,
    item_id: &str,
) -> Option<&'a PriceOverride> {
    overrides
        .iter()
        .find(|o| o.item_type == item_type.as_str() && o.item_id == item_id)
}

/// Resolve one catalog row against the dealer's overrides.
pub fn resolve_item<T: CatalogEntry + Clone>(
    item: &T,
    item_type: ItemType,
    overrides: &[PriceOverride],
) -> ResolvedItem<T> {
    let cost_usd = item.cost_usd();
    let cost_brl = item.cost_brl();
    match find_override(overrides, item_type, &item.item_id()) {
        Some(o) => ResolvedItem {
            item: item.clone(),
            cost_usd,
            cost_brl,
            sale_price_usd: o.sale_price_usd,
            sale_price_brl: o.sale_price_brl,
            margin_percentage: Some(o.margin_percentage),
            dealer_configured: true,
        },
        None => ResolvedItem {
            item: item.clone(),
            cost_usd,
            cost_brl,
            sale_price_usd: cost_usd,
            sale_price_brl: cost_brl,
            margin_percentage: None,
            dealer_configured: false,
        },
    }
}

/// Resolve a catalog collection for one dealer.
///
/// Applies the region filter for kinds where [`ItemType::is_region_filtered`]
/// holds, then merges overrides. Input order is preserved.
pub fn resolve_items<T: CatalogEntry + Clone>(
    items: &[T],
    item_type: ItemType,
    overrides: &[PriceOverride],
    dealer_country: &str,
) -> Vec<ResolvedItem<T>> {
    items
        .iter()
        .filter(|item| {
            !item_type.is_region_filtered() || is_visible_in_country(item.countries(), dealer_country)
        })
        .map(|item| resolve_item(item, item_type, overrides))
        .collect()
}

/// The full resolved configuration returned to a dealer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerConfig<T> {
    pub boat_models: Vec<ResolvedItem<T>>,
    pub engine_packages: Vec<ResolvedItem<T>>,
    pub hull_colors: Vec<ResolvedItem<T>>,
    pub upholstery_packages: Vec<ResolvedItem<T>>,
    pub additional_options: Vec<ResolvedItem<T>>,
    pub dealer_country: String,
    pub dealer_pricing_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        usd: f64,
        brl: f64,
        countries: Option<Vec<String>>,
    }

    impl CatalogEntry for Item {
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

    fn item(id: i64, usd: f64, brl: f64) -> Item {
        Item {
            id,
            usd,
            brl,
            countries: None,
        }
    }

    fn engine(id: i64, countries: &[&str]) -> Item {
        Item {
            countries: Some(countries.iter().map(|c| c.to_string()).collect()),
            ..item(id, 1000.0, 5000.0)
        }
    }

    fn override_for(item_type: ItemType, item_id: &str, usd: f64, brl: f64) -> PriceOverride {
        PriceOverride {
            item_type: item_type.as_str().to_string(),
            item_id: item_id.to_string(),
            sale_price_usd: usd,
            sale_price_brl: brl,
            margin_percentage: 10.0,
        }
    }

    fn valid_input() -> PricingInput {
        PricingInput {
            dealer_id: json!("12"),
            item_type: Some("boat_model".to_string()),
            item_id: json!(7),
            item_name: Some("Sport 32".to_string()),
            sale_price_usd: Some(55000.0),
            sale_price_brl: Some(275000.0),
            margin_percentage: Some(10.0),
        }
    }

    // -- validate_pricing_input --

    #[test]
    fn valid_input_is_accepted() {
        let v = validate_pricing_input(&valid_input()).unwrap();
        assert_eq!(v.dealer_id, 12);
        assert_eq!(v.item_type, ItemType::BoatModel);
        assert_eq!(v.item_id, "7");
        assert_eq!(v.sale_price_brl, 275000.0);
    }

    #[test]
    fn blank_required_fields_rejected() {
        let mut input = valid_input();
        input.dealer_id = json!("   ");
        assert_matches!(validate_pricing_input(&input), Err(CoreError::Validation(_)));

        let mut input = valid_input();
        input.item_type = Some(" ".to_string());
        assert_matches!(validate_pricing_input(&input), Err(CoreError::Validation(_)));

        let mut input = valid_input();
        input.item_name = None;
        assert_matches!(validate_pricing_input(&input), Err(CoreError::Validation(_)));

        let mut input = valid_input();
        input.item_id = Value::Null;
        assert_matches!(validate_pricing_input(&input), Err(CoreError::Validation(_)));
    }

    #[test]
    fn price_over_cap_rejected() {
        let mut input = valid_input();
        input.sale_price_usd = Some(100_000_000.0);
        assert_matches!(validate_pricing_input(&input), Err(CoreError::Validation(_)));
    }

    #[test]
    fn negative_margin_rejected() {
        let mut input = valid_input();
        input.margin_percentage = Some(-5.0);
        assert_matches!(validate_pricing_input(&input), Err(CoreError::Validation(_)));
    }

    #[test]
    fn prices_rounded_to_cents() {
        let mut input = valid_input();
        input.sale_price_usd = Some(123.456);
        let v = validate_pricing_input(&input).unwrap();
        assert_eq!(v.sale_price_usd, 123.46);
    }

    #[test]
    fn non_numeric_dealer_id_rejected() {
        let mut input = valid_input();
        input.dealer_id = json!("dealer-abc");
        assert_matches!(validate_pricing_input(&input), Err(CoreError::Validation(_)));
    }

    // -- resolution --

    #[test]
    fn override_sets_sale_price_but_keeps_cost() {
        let boat = item(7, 50000.0, 250000.0);
        let overrides = vec![override_for(ItemType::BoatModel, "7", 55000.0, 275000.0)];

        let resolved = resolve_item(&boat, ItemType::BoatModel, &overrides);

        assert_eq!(resolved.cost_usd, 50000.0);
        assert_eq!(resolved.cost_brl, 250000.0);
        assert_eq!(resolved.sale_price_usd, 55000.0);
        assert_eq!(resolved.sale_price_brl, 275000.0);
        assert!(resolved.dealer_configured);
        assert_eq!(resolved.item, boat);
    }

    #[test]
    fn missing_override_falls_back_to_cost() {
        let boat = item(7, 50000.0, 250000.0);
        let resolved = resolve_item(&boat, ItemType::BoatModel, &[]);

        assert_eq!(resolved.sale_price_brl, 250000.0);
        assert_eq!(resolved.sale_price_usd, 50000.0);
        assert!(!resolved.dealer_configured);
        assert_eq!(resolved.margin_percentage, None);
    }

    #[test]
    fn override_for_other_item_type_is_ignored() {
        let boat = item(7, 50000.0, 250000.0);
        let overrides = vec![override_for(ItemType::HullColor, "7", 1.0, 1.0)];

        let resolved = resolve_item(&boat, ItemType::BoatModel, &overrides);
        assert!(!resolved.dealer_configured);
    }

    #[test]
    fn first_matching_override_wins() {
        let boat = item(7, 50000.0, 250000.0);
        let overrides = vec![
            override_for(ItemType::BoatModel, "7", 60000.0, 300000.0),
            override_for(ItemType::BoatModel, "7", 55000.0, 275000.0),
        ];

        let resolved = resolve_item(&boat, ItemType::BoatModel, &overrides);
        assert_eq!(resolved.sale_price_usd, 60000.0);
    }

    #[test]
    fn region_filter_applies_to_engines() {
        let engines = vec![engine(1, &["BR"]), engine(2, &[]), engine(3, &["All"])];

        let br = resolve_items(&engines, ItemType::EnginePackage, &[], "BR");
        let us = resolve_items(&engines, ItemType::EnginePackage, &[], "US");

        let ids = |v: &[ResolvedItem<Item>]| v.iter().map(|r| r.item.id).collect::<Vec<_>>();
        assert_eq!(ids(&br), vec![1, 2, 3]);
        assert_eq!(ids(&us), vec![2, 3]);
    }

    #[test]
    fn region_filter_skipped_for_boat_models() {
        let boats = vec![engine(1, &["BR"])];
        let us = resolve_items(&boats, ItemType::BoatModel, &[], "US");
        assert_eq!(us.len(), 1);
    }

    #[test]
    fn resolved_item_serializes_flat() {
        let resolved = resolve_item(&item(7, 1.0, 2.0), ItemType::BoatModel, &[]);
        #[derive(Serialize, Clone)]
        struct Named {
            name: &'static str,
        }
        let named = ResolvedItem {
            item: Named { name: "Sport 32" },
            cost_usd: resolved.cost_usd,
            cost_brl: resolved.cost_brl,
            sale_price_usd: resolved.sale_price_usd,
            sale_price_brl: resolved.sale_price_brl,
            margin_percentage: None,
            dealer_configured: false,
        };
        let json = serde_json::to_value(&named).unwrap();
        assert_eq!(json["name"], "Sport 32");
        assert_eq!(json["cost_brl"], 2.0);
        assert_eq!(json["dealer_configured"], false);
    }
}

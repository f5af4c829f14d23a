//! Catalog item kinds and region visibility rules.
//!
//! The portal sells five kinds of catalog items. Each kind lives in its own
//! table but shares the same shape, so the kind is carried around as an
//! [`ItemType`] and mapped to table names and wire strings here.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Country marker meaning "visible everywhere".
pub const ALL_COUNTRIES: &str = "All";

pub const ITEM_TYPE_BOAT_MODEL: &str = "boat_model";
pub const ITEM_TYPE_ENGINE_PACKAGE: &str = "engine_package";
pub const ITEM_TYPE_HULL_COLOR: &str = "hull_color";
pub const ITEM_TYPE_UPHOLSTERY_PACKAGE: &str = "upholstery_package";
pub const ITEM_TYPE_ADDITIONAL_OPTION: &str = "additional_option";

/// All valid item type strings.
pub const VALID_ITEM_TYPES: &[&str] = &[
    ITEM_TYPE_BOAT_MODEL,
    ITEM_TYPE_ENGINE_PACKAGE,
    ITEM_TYPE_HULL_COLOR,
    ITEM_TYPE_UPHOLSTERY_PACKAGE,
    ITEM_TYPE_ADDITIONAL_OPTION,
];

// ---------------------------------------------------------------------------
// ItemType
// ---------------------------------------------------------------------------

/// The kind of a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    BoatModel,
    EnginePackage,
    HullColor,
    UpholsteryPackage,
    AdditionalOption,
}

impl ItemType {
    /// Every kind, in the order collections appear in responses.
    pub const ALL: [ItemType; 5] = [
        ItemType::BoatModel,
        ItemType::EnginePackage,
        ItemType::HullColor,
        ItemType::UpholsteryPackage,
        ItemType::AdditionalOption,
    ];

    /// Parse the wire/database string value.
    ///
    /// Accepts the singular form (`engine_package`) and, for URL paths, the
    /// table name (`engine_packages`).
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s.trim() {
            ITEM_TYPE_BOAT_MODEL | "boat_models" => Ok(Self::BoatModel),
            ITEM_TYPE_ENGINE_PACKAGE | "engine_packages" => Ok(Self::EnginePackage),
            ITEM_TYPE_HULL_COLOR | "hull_colors" => Ok(Self::HullColor),
            ITEM_TYPE_UPHOLSTERY_PACKAGE | "upholstery_packages" => Ok(Self::UpholsteryPackage),
            ITEM_TYPE_ADDITIONAL_OPTION | "additional_options" => Ok(Self::AdditionalOption),
            other => Err(CoreError::Validation(format!(
                "Invalid item_type '{other}'. Must be one of: {}",
                VALID_ITEM_TYPES.join(", ")
            ))),
        }
    }

    /// The string stored in `dealer_pricing.item_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoatModel => ITEM_TYPE_BOAT_MODEL,
            Self::EnginePackage => ITEM_TYPE_ENGINE_PACKAGE,
            Self::HullColor => ITEM_TYPE_HULL_COLOR,
            Self::UpholsteryPackage => ITEM_TYPE_UPHOLSTERY_PACKAGE,
            Self::AdditionalOption => ITEM_TYPE_ADDITIONAL_OPTION,
        }
    }

    /// The table holding items of this kind.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::BoatModel => "boat_models",
            Self::EnginePackage => "engine_packages",
            Self::HullColor => "hull_colors",
            Self::UpholsteryPackage => "upholstery_packages",
            Self::AdditionalOption => "additional_options",
        }
    }

    /// Whether items of this kind are hidden from dealers outside their
    /// `countries` list.
    ///
    /// Only engine packages and additional options are region-filtered.
    /// Boat models, hull colors and upholstery are shown to every dealer.
    pub fn is_region_filtered(&self) -> bool {
        matches!(self, Self::EnginePackage | Self::AdditionalOption)
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Region visibility
// ---------------------------------------------------------------------------

/// Whether an item restricted to `countries` is visible to a dealer in
/// `dealer_country`.
///
/// Visible when the list is absent or empty, contains [`ALL_COUNTRIES`], or
/// contains the dealer's country.
pub fn is_visible_in_country(countries: Option<&[String]>, dealer_country: &str) -> bool {
    let Some(countries) = countries else {
        return true;
    };
    countries.is_empty()
        || countries
            .iter()
            .any(|c| c == ALL_COUNTRIES || c == dealer_country)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn item_type_round_trips_through_str() {
        for kind in ItemType::ALL {
            assert_eq!(ItemType::from_str_value(kind.as_str()).unwrap(), kind);
            assert_eq!(ItemType::from_str_value(kind.table_name()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_item_type_rejected() {
        assert!(ItemType::from_str_value("trailer").is_err());
        assert!(ItemType::from_str_value("").is_err());
    }

    #[test]
    fn only_engines_and_options_are_region_filtered() {
        assert!(ItemType::EnginePackage.is_region_filtered());
        assert!(ItemType::AdditionalOption.is_region_filtered());
        assert!(!ItemType::BoatModel.is_region_filtered());
        assert!(!ItemType::HullColor.is_region_filtered());
        assert!(!ItemType::UpholsteryPackage.is_region_filtered());
    }

    #[test]
    fn country_specific_item_visible_only_in_that_country() {
        let br = list(&["BR"]);
        assert!(is_visible_in_country(Some(br.as_slice()), "BR"));
        assert!(!is_visible_in_country(Some(br.as_slice()), "US"));
    }

    #[test]
    fn unrestricted_items_visible_everywhere() {
        let empty: Vec<String> = Vec::new();
        let all = list(&["All"]);
        for country in ["BR", "US"] {
            assert!(is_visible_in_country(None, country));
            assert!(is_visible_in_country(Some(empty.as_slice()), country));
            assert!(is_visible_in_country(Some(all.as_slice()), country));
        }
    }

    #[test]
    fn dealer_without_country_sees_only_unrestricted_items() {
        let br = list(&["BR"]);
        let all = list(&["All"]);
        assert!(!is_visible_in_country(Some(br.as_slice()), ALL_COUNTRIES));
        assert!(is_visible_in_country(Some(all.as_slice()), ALL_COUNTRIES));
    }
}

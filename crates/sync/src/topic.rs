//! Per-topic bus configuration.
//!
//! Every topic uses the same bus; only names, tables and the debounce
//! window differ.

use std::time::Duration;

use dealerhub_core::sync::{ADMIN_DATA_TABLES, DEALER_PRICING_MARKER_KEY};

/// Debounce used when a caller does not pick one.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq)]
pub struct TopicConfig {
    /// Short name used in logs and toasts.
    pub name: String,
    /// In-page event name this topic reacts to.
    pub event_name: String,
    /// Storage key holding the topic's last-update marker.
    pub storage_key: String,
    /// Tables whose realtime changes concern this topic.
    pub tables: Vec<String>,
    pub debounce: Duration,
    /// Drop signals carrying another dealer's id.
    pub dealer_scoped: bool,
}

fn owned(tables: &[&str]) -> Vec<String> {
    tables.iter().map(|t| t.to_string()).collect()
}

impl TopicConfig {
    /// A topic with the default (pricing) debounce window.
    pub fn new(
        name: impl Into<String>,
        event_name: impl Into<String>,
        storage_key: impl Into<String>,
        tables: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            event_name: event_name.into(),
            storage_key: storage_key.into(),
            tables,
            debounce: DEFAULT_DEBOUNCE,
            dealer_scoped: false,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn dealer_scoped(mut self) -> Self {
        self.dealer_scoped = true;
        self
    }

    /// Bulk admin catalog changes.
    pub fn admin_data() -> Self {
        Self::new(
            "admin_data",
            "adminDataUpdated",
            "adminDataLastUpdate",
            owned(ADMIN_DATA_TABLES),
        )
        .with_debounce(Duration::from_millis(300))
    }

    pub fn boat_models() -> Self {
        Self::new(
            "boat_models",
            "boatModelsUpdated",
            "boatModelsLastUpdate",
            owned(&["boat_models"]),
        )
        .with_debounce(Duration::from_millis(500))
    }

    /// Engine packages, hull colors, upholstery and additional options.
    pub fn options() -> Self {
        Self::new(
            "options",
            "optionsUpdated",
            "optionsLastUpdate",
            owned(&[
                "engine_packages",
                "hull_colors",
                "upholstery_packages",
                "additional_options",
            ]),
        )
        .with_debounce(Duration::from_millis(500))
    }

    pub fn dealer_pricing() -> Self {
        Self::new(
            "dealer_pricing",
            "dealerPricingUpdated",
            DEALER_PRICING_MARKER_KEY,
            owned(&["dealer_pricing"]),
        )
        .dealer_scoped()
    }

    /// Whether a change on `table` concerns this topic.
    pub fn watches(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }

    /// Whether a signal from `incoming` dealer should reach a tab acting for
    /// `current`. Unscoped topics and signals without a dealer always pass.
    pub fn accepts_dealer(&self, current: Option<&str>, incoming: Option<&str>) -> bool {
        if !self.dealer_scoped {
            return true;
        }
        match (current, incoming) {
            (Some(current), Some(incoming)) => current == incoming,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_debounce_windows() {
        assert_eq!(TopicConfig::admin_data().debounce, Duration::from_millis(300));
        assert_eq!(TopicConfig::boat_models().debounce, Duration::from_millis(500));
        assert_eq!(TopicConfig::options().debounce, Duration::from_millis(500));
        assert_eq!(TopicConfig::dealer_pricing().debounce, Duration::from_millis(1000));
        assert_eq!(
            TopicConfig::new("x", "x", "x", Vec::new()).debounce,
            DEFAULT_DEBOUNCE
        );
    }

    #[test]
    fn pricing_topic_uses_shared_marker_key() {
        let topic = TopicConfig::dealer_pricing();
        assert_eq!(topic.storage_key, "dealerPricingLastUpdate");
        assert!(topic.watches("dealer_pricing"));
        assert!(!topic.watches("boat_models"));
    }

    #[test]
    fn dealer_scope_filter() {
        let scoped = TopicConfig::dealer_pricing();
        assert!(scoped.accepts_dealer(Some("1"), Some("1")));
        assert!(!scoped.accepts_dealer(Some("1"), Some("2")));
        assert!(scoped.accepts_dealer(Some("1"), None));
        assert!(scoped.accepts_dealer(None, Some("2")));

        let unscoped = TopicConfig::options();
        assert!(unscoped.accepts_dealer(Some("1"), Some("2")));
    }
}

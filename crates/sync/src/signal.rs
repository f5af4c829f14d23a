use std::collections::BTreeSet;

use dealerhub_core::sync::{ChangeNotice, StorageMarker};
use dealerhub_core::types::{now_millis, EpochMillis};
use serde::{Deserialize, Serialize};

/// Which input channel produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    PageEvent,
    Storage,
    Heartbeat,
    Realtime,
    /// Sent directly through a handle.
    Manual,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageEvent => "page_event",
            Self::Storage => "storage",
            Self::Heartbeat => "heartbeat",
            Self::Realtime => "realtime",
            Self::Manual => "manual",
        }
    }

    /// Clock that stamps signals from this source.
    pub fn clock(&self) -> ClockDomain {
        match self {
            Self::Realtime => ClockDomain::Database,
            _ => ClockDomain::Client,
        }
    }
}

/// Where a signal's timestamp comes from. Timestamps are only comparable
/// within one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockDomain {
    /// The tab's own clock: storage markers, page events, heartbeats.
    Client,
    /// The database clock stamped into change notifications.
    Database,
}

/// An update notification delivered to a bus.
///
/// `timestamp` identifies the logical update: two signals with the same
/// timestamp describe the same write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: EpochMillis,
    pub data_types: BTreeSet<String>,
    pub action: String,
    /// Flush without waiting for the debounce window.
    pub immediate: bool,
    pub dealer_id: Option<String>,
    pub source: SignalSource,
}

impl Signal {
    pub fn new(timestamp: EpochMillis, source: SignalSource) -> Self {
        Self {
            timestamp,
            data_types: BTreeSet::new(),
            action: "update".to_string(),
            immediate: false,
            dealer_id: None,
            source,
        }
    }

    /// A manual signal stamped with the current time.
    pub fn now() -> Self {
        Self::new(now_millis(), SignalSource::Manual)
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_types.insert(data_type.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn with_dealer(mut self, dealer_id: Option<String>) -> Self {
        self.dealer_id = dealer_id;
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn with_source(mut self, source: SignalSource) -> Self {
        self.source = source;
        self
    }

    pub fn from_marker(marker: &StorageMarker, source: SignalSource) -> Self {
        Self::new(marker.timestamp, source).with_dealer(marker.dealer_id.clone())
    }

    pub fn from_notice(notice: &ChangeNotice) -> Self {
        Self::new(notice.timestamp, SignalSource::Realtime)
            .with_data_type(notice.table.clone())
            .with_action(notice.action.as_str().to_lowercase())
            .with_dealer(notice.dealer_id.clone())
    }
}

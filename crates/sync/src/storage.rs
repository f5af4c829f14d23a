//! Key/value storage shared by every tab of a browser profile.
//!
//! Writes are announced to the *other* tabs only, like the browser's
//! `storage` event. A synthetic event can be dispatched explicitly; it
//! reaches every tab including the writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};

use dealerhub_core::types::{now_millis, EpochMillis};
use tokio::sync::broadcast;

const STORAGE_EVENT_CAPACITY: usize = 64;

/// A storage change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
    /// Tab that performed the write. `None` for synthetic events.
    pub origin: Option<String>,
}

pub struct SharedStorage {
    values: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    last_stamp: AtomicI64,
}

impl SharedStorage {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(STORAGE_EVENT_CAPACITY);
        Self {
            values: Mutex::new(HashMap::new()),
            events,
            last_stamp: AtomicI64::new(0),
        }
    }

    /// Wall-clock millis for a new marker, strictly greater than any stamp
    /// handed out before so writes in the same millisecond stay distinct.
    pub fn next_stamp(&self) -> EpochMillis {
        let now = now_millis();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Store `value` under `key` on behalf of tab `writer`.
    pub fn set(&self, writer: &str, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.clone());
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            new_value: Some(value),
            origin: Some(writer.to_string()),
        });
    }

    pub fn remove(&self, writer: &str, key: &str) {
        let removed = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if removed.is_some() {
            let _ = self.events.send(StorageEvent {
                key: key.to_string(),
                new_value: None,
                origin: Some(writer.to_string()),
            });
        }
    }

    /// Announce the current value of `key` to every tab.
    pub fn dispatch_synthetic(&self, key: &str) {
        let _ = self.events.send(StorageEvent {
            key: key.to_string(),
            new_value: self.get(key),
            origin: None,
        });
    }

    /// Listen for storage events as tab `tab_id`.
    pub fn subscribe(&self, tab_id: impl Into<String>) -> StorageListener {
        StorageListener {
            tab_id: tab_id.into(),
            receiver: self.events.subscribe(),
        }
    }
}

impl Default for SharedStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage events as seen by one tab.
pub struct StorageListener {
    tab_id: String,
    receiver: broadcast::Receiver<StorageEvent>,
}

impl StorageListener {
    /// Next event not written by this tab. `None` once the storage is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin.as_deref() == Some(self.tab_id.as_str()) => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(tab_id = %self.tab_id, skipped, "Storage listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

//! Toast notifications for sync outcomes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::bus::{Phase, SyncHandle};

pub const DEFAULT_TOAST_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn new(level: ToastLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Success, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Error, title, message)
    }
}

/// Bounded queue of recent toasts. The oldest toast is dropped once the
/// queue is full.
pub struct ToastCenter {
    capacity: usize,
    recent: Mutex<VecDeque<Toast>>,
    sender: broadcast::Sender<Toast>,
}

impl ToastCenter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1) * 4);
        Self {
            capacity,
            recent: Mutex::new(VecDeque::with_capacity(capacity)),
            sender,
        }
    }

    pub fn push(&self, toast: Toast) {
        {
            let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
            while recent.len() >= self.capacity && !recent.is_empty() {
                recent.pop_front();
            }
            if self.capacity > 0 {
                recent.push_back(toast.clone());
            }
        }
        let _ = self.sender.send(toast);
    }

    /// Recent toasts, oldest first.
    pub fn recent(&self) -> Vec<Toast> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.sender.subscribe()
    }
}

impl Default for ToastCenter {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_CAPACITY)
    }
}

/// Turn a bus's completed fetches and fetch errors into toasts until the
/// bus is torn down.
pub fn watch_updates<T>(handle: &SyncHandle<T>, center: Arc<ToastCenter>) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
{
    let topic = handle.topic().name.clone();
    let mut updates = handle.subscribe();
    let mut state = handle.watch_state();
    let cancel = handle.cancellation_token();
    let mut reported_failures = 0u64;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                update = updates.recv() => match update {
                    Ok(update) => center.push(Toast::success(
                        "Prices updated",
                        format!("{topic} refreshed ({})", update.signal.source.as_str()),
                    )),
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = state.borrow_and_update().clone();
                    if current.phase == Phase::Fetching {
                        continue;
                    }
                    if let Some(error) = current.last_error {
                        if current.fetch_count > reported_failures {
                            reported_failures = current.fetch_count;
                            center.push(Toast::error("Sync failed", format!("{topic}: {error}")));
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::bus::SyncBus;
    use crate::signal::{Signal, SignalSource};
    use crate::testing::RecordingFetcher;
    use crate::topic::TopicConfig;

    #[test]
    fn queue_is_bounded() {
        let center = ToastCenter::default();
        for i in 0..7 {
            center.push(Toast::success("t", format!("{i}")));
        }
        let recent = center.recent();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].message, "2");
        assert_eq!(recent[4].message, "6");

        center.clear();
        assert!(center.recent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_outcomes_become_toasts() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());
        let center = Arc::new(ToastCenter::default());
        watch_updates(&handle, Arc::clone(&center));

        handle.signal(Signal::new(1, SignalSource::Storage)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        fetcher.set_failing(true);
        handle.signal(Signal::new(2, SignalSource::Storage)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let toasts = center.recent();
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[0].level, ToastLevel::Success);
        assert!(toasts[0].message.contains("dealer_pricing"));
        assert_eq!(toasts[1].level, ToastLevel::Error);
        assert!(toasts[1].message.contains("Internal server error"));
    }
}

//! In-page events, the same-tab notification channel.

use tokio::sync::broadcast;

use crate::signal::Signal;

const PAGE_EVENT_CAPACITY: usize = 64;

/// A named event dispatched within one tab.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvent {
    pub name: String,
    pub detail: Signal,
}

/// Event target of one tab. Cloning shares the same target.
#[derive(Clone)]
pub struct PageEvents {
    sender: broadcast::Sender<PageEvent>,
}

impl PageEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(PAGE_EVENT_CAPACITY);
        Self { sender }
    }

    /// Dispatch an event to every listener. Returns how many received it.
    pub fn dispatch(&self, name: impl Into<String>, detail: Signal) -> usize {
        self.sender
            .send(PageEvent {
                name: name.into(),
                detail,
            })
            .unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.sender.subscribe()
    }
}

impl Default for PageEvents {
    fn default() -> Self {
        Self::new()
    }
}

//! Client-side sync bus for the dealer portal.
//!
//! Each browser tab (modelled by [`service::TabContext`]) runs one debounced
//! [`bus::SyncBus`] per topic. Four input channels feed every bus: in-page
//! events, cross-tab storage writes, a heartbeat poll of the storage marker,
//! and the realtime websocket feed. Whichever fires first wins; the rest are
//! collapsed by the debounce window or dropped by timestamp idempotency.

pub mod bus;
pub mod channels;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod notify;
pub mod page;
pub mod service;
pub mod signal;
pub mod storage;
pub mod toast;
pub mod topic;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::{BusState, Fetcher, Phase, SyncBus, SyncHandle, SyncUpdate, Watermarks};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use service::{SyncService, TabContext};
pub use signal::{ClockDomain, Signal, SignalSource};
pub use topic::TopicConfig;

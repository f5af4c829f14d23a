//! Row-change fan-out for the dealer portal.
//!
//! - [`EventBus`]: in-process publish/subscribe hub for
//!   [`ChangeNotice`](dealerhub_core::sync::ChangeNotice)s, backed by
//!   `tokio::sync::broadcast`.
//! - [`ChangeFeedListener`]: background service that `LISTEN`s on the
//!   Postgres change channel and republishes every notification on the bus.

pub mod bus;
pub mod listener;

pub use bus::EventBus;
pub use listener::ChangeFeedListener;

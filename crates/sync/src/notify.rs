//! Producer side: announcing a write to every tab.

use std::time::Duration;

use dealerhub_core::sync::StorageMarker;

use crate::service::TabContext;
use crate::signal::{Signal, SignalSource};
use crate::topic::TopicConfig;

/// Announce an update on `topic` from the tab `ctx`.
///
/// Order matters: the storage marker is written first so a listener reacting
/// to the page event in the same tick already reads the new value. Then the
/// page event is dispatched, and `synthetic_delay` later a synthetic storage
/// event is delivered to every tab, the writer included.
///
/// Returns the signal that was dispatched.
pub fn notify_update(
    ctx: &TabContext,
    topic: &TopicConfig,
    dealer_id: Option<String>,
    synthetic_delay: Duration,
) -> Signal {
    let timestamp = ctx.storage.next_stamp();
    let marker = StorageMarker {
        timestamp,
        dealer_id: dealer_id.clone(),
    };
    ctx.storage.set(&ctx.tab_id, &topic.storage_key, marker.to_json());

    let signal = Signal::new(timestamp, SignalSource::PageEvent)
        .with_dealer(dealer_id)
        .with_data_type(topic.name.clone());
    let listeners = ctx.page.dispatch(topic.event_name.clone(), signal.clone());

    let storage = ctx.storage.clone();
    let key = topic.storage_key.clone();
    tokio::spawn(async move {
        tokio::time::sleep(synthetic_delay).await;
        storage.dispatch_synthetic(&key);
    });

    tracing::debug!(
        topic = %topic.name,
        tab_id = %ctx.tab_id,
        timestamp,
        listeners,
        "Update announced",
    );
    signal
}

//! The four input channels that feed a bus.
//!
//! 1. page events, for a mutation and a consumer living in the same tab;
//! 2. storage events, for writes made by another tab;
//! 3. a heartbeat that re-reads the storage marker, for when the event
//!    paths silently stop firing;
//! 4. the realtime change feed, for writes made anywhere else.
//!
//! Every channel runs as its own task and stops when the bus is torn down.
//! Overlap between channels is expected; the bus drops repeats.

use std::sync::Arc;
use std::time::Duration;

use dealerhub_core::sync::StorageMarker;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::bus::{SignalSender, SyncHandle};
use crate::config::SyncConfig;
use crate::feed::{ChangeFeed, WsChangeFeed};
use crate::page::PageEvents;
use crate::service::TabContext;
use crate::signal::{Signal, SignalSource};
use crate::storage::SharedStorage;
use crate::topic::TopicConfig;

/// Forward a signal unless the topic's dealer scope rejects it.
fn forward(topic: &TopicConfig, sender: &SignalSender, dealer_id: Option<&str>, signal: Signal) {
    if !topic.accepts_dealer(dealer_id, signal.dealer_id.as_deref()) {
        tracing::trace!(
            topic = %topic.name,
            incoming = ?signal.dealer_id,
            "Dropping signal for another dealer",
        );
        return;
    }
    if sender.send(signal).is_err() {
        tracing::debug!(topic = %topic.name, "Bus closed, signal dropped");
    }
}

fn parse_marker(topic: &TopicConfig, raw: &str) -> Option<StorageMarker> {
    let marker = StorageMarker::parse(raw);
    if marker.is_none() {
        tracing::warn!(topic = %topic.name, key = %topic.storage_key, "Malformed storage marker");
    }
    marker
}

/// Listen for in-page events named exactly `topic.event_name`.
pub fn spawn_page_listener(
    topic: TopicConfig,
    page: &PageEvents,
    sender: SignalSender,
    dealer_id: Option<String>,
) -> JoinHandle<()> {
    let mut events = page.subscribe();
    let cancel = sender.cancellation_token().clone();

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(event) if event.name == topic.event_name => {
                    let signal = event.detail.with_source(SignalSource::PageEvent);
                    forward(&topic, &sender, dealer_id.as_deref(), signal);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %topic.name, skipped, "Page listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Listen for storage writes by other tabs on exactly `topic.storage_key`.
pub fn spawn_storage_listener(
    topic: TopicConfig,
    storage: &SharedStorage,
    tab_id: &str,
    sender: SignalSender,
    dealer_id: Option<String>,
) -> JoinHandle<()> {
    let mut listener = storage.subscribe(tab_id);
    let cancel = sender.cancellation_token().clone();

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = listener.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            if event.key != topic.storage_key {
                continue;
            }
            let Some(raw) = event.new_value else {
                continue;
            };
            if let Some(marker) = parse_marker(&topic, &raw) {
                let signal = Signal::from_marker(&marker, SignalSource::Storage);
                forward(&topic, &sender, dealer_id.as_deref(), signal);
            }
        }
    })
}

/// Re-read the storage marker every `period` and signal its timestamp.
///
/// The first read happens one period after start.
pub fn spawn_heartbeat(
    topic: TopicConfig,
    storage: Arc<SharedStorage>,
    period: Duration,
    sender: SignalSender,
    dealer_id: Option<String>,
) -> JoinHandle<()> {
    let cancel = sender.cancellation_token().clone();

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let Some(raw) = storage.get(&topic.storage_key) else {
                continue;
            };
            if let Some(marker) = parse_marker(&topic, &raw) {
                let signal = Signal::from_marker(&marker, SignalSource::Heartbeat);
                forward(&topic, &sender, dealer_id.as_deref(), signal);
            }
        }
    })
}

/// Forward realtime notices on the topic's tables.
pub fn spawn_realtime<C: ChangeFeed>(
    topic: TopicConfig,
    mut feed: C,
    sender: SignalSender,
    dealer_id: Option<String>,
) -> JoinHandle<()> {
    let cancel = sender.cancellation_token().clone();

    tokio::spawn(async move {
        loop {
            let notice = tokio::select! {
                _ = cancel.cancelled() => break,
                notice = feed.next() => match notice {
                    Some(notice) => notice,
                    None => break,
                },
            };
            if !topic.watches(&notice.table) {
                continue;
            }
            forward(&topic, &sender, dealer_id.as_deref(), Signal::from_notice(&notice));
        }
        tracing::debug!(topic = %topic.name, "Realtime channel stopped");
    })
}

/// Wire every channel of `ctx` to `handle`.
pub fn attach<T>(handle: &SyncHandle<T>, ctx: &TabContext, config: &SyncConfig) -> Vec<JoinHandle<()>> {
    let topic = handle.topic().clone();
    let dealer_id = ctx.dealer_id.clone();

    let mut tasks = vec![
        spawn_page_listener(topic.clone(), &ctx.page, handle.sender(), dealer_id.clone()),
        spawn_storage_listener(
            topic.clone(),
            &ctx.storage,
            &ctx.tab_id,
            handle.sender(),
            dealer_id.clone(),
        ),
        spawn_heartbeat(
            topic.clone(),
            Arc::clone(&ctx.storage),
            config.heartbeat_interval,
            handle.sender(),
            dealer_id.clone(),
        ),
    ];

    if config.realtime {
        let feed = WsChangeFeed::new(
            config.ws_url(),
            topic.tables.clone(),
            handle.cancellation_token(),
        )
        .with_reconnect(config.reconnect.clone());
        tasks.push(spawn_realtime(topic, feed, handle.sender(), dealer_id));
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealerhub_core::sync::{ChangeAction, ChangeNotice, DEALER_PRICING_MARKER_KEY};
    use tokio::sync::mpsc;

    use crate::bus::SyncBus;
    use crate::testing::RecordingFetcher;

    fn marker(timestamp: i64, dealer_id: &str) -> String {
        StorageMarker {
            timestamp,
            dealer_id: Some(dealer_id.to_string()),
        }
        .to_json()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn page_listener_matches_exact_event_name() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());
        let page = PageEvents::new();
        spawn_page_listener(handle.topic().clone(), &page, handle.sender(), None);

        page.dispatch("dealerPricingUpdatedLater", Signal::new(1, SignalSource::Manual));
        page.dispatch("optionsUpdated", Signal::new(2, SignalSource::Manual));
        settle().await;
        assert!(fetcher.calls().is_empty());

        page.dispatch("dealerPricingUpdated", Signal::new(3, SignalSource::Manual));
        settle().await;
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].source, SignalSource::PageEvent);
    }

    #[tokio::test(start_paused = true)]
    async fn storage_listener_ignores_own_writes_and_other_keys() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());
        let storage = SharedStorage::new();
        spawn_storage_listener(handle.topic().clone(), &storage, "tab-a", handle.sender(), None);

        storage.set("tab-a", DEALER_PRICING_MARKER_KEY, marker(1, "4"));
        storage.set("tab-b", "dealerPricingLastUpdateBackup", marker(2, "4"));
        storage.set("tab-b", "theme", "dark");
        settle().await;
        assert!(fetcher.calls().is_empty());

        storage.set("tab-b", DEALER_PRICING_MARKER_KEY, marker(3, "4"));
        settle().await;
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].timestamp, 3);
        assert_eq!(calls[0].source, SignalSource::Storage);
    }

    #[tokio::test(start_paused = true)]
    async fn storage_listener_skips_malformed_marker() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());
        let storage = SharedStorage::new();
        spawn_storage_listener(handle.topic().clone(), &storage, "tab-a", handle.sender(), None);

        storage.set("tab-b", DEALER_PRICING_MARKER_KEY, "{not json");
        settle().await;
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn storage_listener_applies_dealer_scope() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());
        let storage = SharedStorage::new();
        spawn_storage_listener(
            handle.topic().clone(),
            &storage,
            "tab-a",
            handle.sender(),
            Some("4".to_string()),
        );

        storage.set("tab-b", DEALER_PRICING_MARKER_KEY, marker(1, "5"));
        settle().await;
        assert!(fetcher.calls().is_empty());

        storage.set("tab-b", DEALER_PRICING_MARKER_KEY, marker(2, "4"));
        settle().await;
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_recovers_missed_marker_once() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());
        let storage = Arc::new(SharedStorage::new());
        // Written before anyone listened: only the heartbeat can see it.
        storage.set("tab-b", DEALER_PRICING_MARKER_KEY, marker(100, "4"));

        spawn_heartbeat(
            handle.topic().clone(),
            Arc::clone(&storage),
            Duration::from_secs(10),
            handle.sender(),
            None,
        );

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(fetcher.calls().is_empty());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fetcher.calls().len(), 1);
        assert_eq!(fetcher.calls()[0].source, SignalSource::Heartbeat);

        // Later ticks see the same marker and are dropped.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fetcher.calls().len(), 1);
    }

    struct ChannelFeed(mpsc::UnboundedReceiver<ChangeNotice>);

    #[async_trait::async_trait]
    impl ChangeFeed for ChannelFeed {
        async fn next(&mut self) -> Option<ChangeNotice> {
            self.0.recv().await
        }
    }

    fn notice(table: &str, dealer_id: &str, timestamp: i64) -> ChangeNotice {
        ChangeNotice {
            table: table.to_string(),
            action: ChangeAction::Update,
            record_id: Some("1".to_string()),
            dealer_id: Some(dealer_id.to_string()),
            timestamp,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn realtime_filters_tables_and_dealers() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_realtime(
            handle.topic().clone(),
            ChannelFeed(rx),
            handle.sender(),
            Some("4".to_string()),
        );

        tx.send(notice("boat_models", "4", 1)).unwrap();
        tx.send(notice("dealer_pricing", "5", 2)).unwrap();
        settle().await;
        assert!(fetcher.calls().is_empty());

        tx.send(notice("dealer_pricing", "4", 3)).unwrap();
        settle().await;
        let calls = fetcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].source, SignalSource::Realtime);
        assert!(calls[0].data_types.contains("dealer_pricing"));
    }

    #[tokio::test(start_paused = true)]
    async fn channels_stop_on_teardown() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::options(), fetcher);
        let page = PageEvents::new();
        let task = spawn_page_listener(handle.topic().clone(), &page, handle.sender(), None);

        handle.teardown();
        task.await.unwrap();
    }
}

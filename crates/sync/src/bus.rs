//! Debounced re-fetch bus, one instance per topic.
//!
//! The bus is an actor task that owns all mutable state. Signals arrive on
//! an unbounded channel; the actor moves through three phases:
//!
//! ```text
//! Idle --signal--> PendingFlush --deadline--> Fetching --settles--> Idle
//!                    ^    |                       |
//!                    +----+ (signal resets        +--> PendingFlush when signals
//!                            the deadline)             arrived during the fetch
//! ```
//!
//! At most one fetch is in flight. Signals whose timestamp is not newer than
//! the last processed one from the same clock are dropped, so the same
//! update seen through several channels fetches once. Client and database
//! timestamps keep separate watermarks since the two clocks may disagree.

use std::sync::Arc;

use async_trait::async_trait;
use dealerhub_core::types::EpochMillis;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::{SyncError, SyncResult};
use crate::signal::{ClockDomain, Signal};
use crate::topic::TopicConfig;

const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Performs the re-fetch a bus triggers.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Fetch fresh data. `signal` is the most recent signal of the flushed
    /// burst.
    async fn fetch(&self, signal: &Signal) -> SyncResult<Self::Output>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A debounce deadline is armed.
    PendingFlush,
    Fetching,
}

/// Newest processed timestamp per clock domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Watermarks {
    pub client: Option<EpochMillis>,
    pub database: Option<EpochMillis>,
}

impl Watermarks {
    pub fn get(&self, clock: ClockDomain) -> Option<EpochMillis> {
        match clock {
            ClockDomain::Client => self.client,
            ClockDomain::Database => self.database,
        }
    }

    /// Whether `signal` is no newer than what its clock already processed.
    pub fn covers(&self, signal: &Signal) -> bool {
        self.get(signal.source.clock())
            .is_some_and(|last| signal.timestamp <= last)
    }

    fn advance(&mut self, clock: ClockDomain, timestamp: EpochMillis) {
        let slot = match clock {
            ClockDomain::Client => &mut self.client,
            ClockDomain::Database => &mut self.database,
        };
        *slot = Some(slot.map_or(timestamp, |last| last.max(timestamp)));
    }

    fn merge(&mut self, other: &Watermarks) {
        if let Some(ts) = other.client {
            self.advance(ClockDomain::Client, ts);
        }
        if let Some(ts) = other.database {
            self.advance(ClockDomain::Database, ts);
        }
    }
}

/// Observable bus state, published on a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BusState {
    pub phase: Phase,
    pub last_processed: Watermarks,
    /// Fetches started since the bus was spawned.
    pub fetch_count: u64,
    /// Error of the most recent fetch; cleared by the next success.
    pub last_error: Option<String>,
    /// Most recent accepted signal.
    pub last_signal: Option<Signal>,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            last_processed: Watermarks::default(),
            fetch_count: 0,
            last_error: None,
            last_signal: None,
        }
    }
}

/// A completed fetch, rebroadcast to every subscriber of the bus.
#[derive(Debug, Clone)]
pub struct SyncUpdate<T> {
    pub signal: Signal,
    pub output: T,
}

/// Signals buffered since the last flush.
struct Pending {
    latest: Signal,
    seen: Watermarks,
    count: usize,
}

pub struct SyncBus<F: Fetcher> {
    topic: Arc<TopicConfig>,
    fetcher: Arc<F>,
    signals: mpsc::UnboundedReceiver<Signal>,
    signals_open: bool,
    state: watch::Sender<BusState>,
    updates: broadcast::Sender<SyncUpdate<F::Output>>,
    cancel: CancellationToken,
    pending: Option<Pending>,
    deadline: Option<Instant>,
    last_processed: Watermarks,
}

impl<F: Fetcher> SyncBus<F> {
    /// Spawn a bus for `topic` and return its handle.
    ///
    /// The bus stops when [`SyncHandle::teardown`] is called or when every
    /// clone of the handle has been dropped.
    pub fn spawn(topic: TopicConfig, fetcher: F) -> SyncHandle<F::Output> {
        let topic = Arc::new(topic);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(BusState::default());
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let bus = Self {
            topic: Arc::clone(&topic),
            fetcher: Arc::new(fetcher),
            signals: signal_rx,
            signals_open: true,
            state: state_tx,
            updates: updates.clone(),
            cancel: cancel.clone(),
            pending: None,
            deadline: None,
            last_processed: Watermarks::default(),
        };
        tokio::spawn(bus.run());

        SyncHandle {
            topic,
            sender: SignalSender {
                tx: signal_tx,
                cancel: cancel.clone(),
            },
            state: state_rx,
            updates,
            cancel: cancel.clone(),
            _teardown: Arc::new(cancel.drop_guard()),
        }
    }

    async fn run(mut self) {
        tracing::debug!(topic = %self.topic.name, "Sync bus started");

        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                received = self.signals.recv(), if self.signals_open => match received {
                    Some(signal) => self.accept(signal),
                    None => self.signals_open = false,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if !self.flush().await {
                        break;
                    }
                }
            }

            if !self.signals_open && self.deadline.is_none() {
                break;
            }
        }

        self.pending = None;
        self.deadline = None;
        self.state.send_modify(|s| s.phase = Phase::Idle);
        tracing::debug!(topic = %self.topic.name, "Sync bus stopped");
    }

    fn accept(&mut self, signal: Signal) {
        if self.last_processed.covers(&signal) {
            tracing::trace!(
                topic = %self.topic.name,
                timestamp = signal.timestamp,
                source = signal.source.as_str(),
                "Ignoring already processed signal",
            );
            return;
        }

        let mut pending = self.pending.take().unwrap_or_else(|| Pending {
            latest: signal.clone(),
            seen: Watermarks::default(),
            count: 0,
        });
        pending.seen.advance(signal.source.clock(), signal.timestamp);
        pending.latest = signal.clone();
        pending.count += 1;
        self.pending = Some(pending);

        let fetching = self.state.borrow().phase == Phase::Fetching;
        if fetching {
            // Re-armed once the in-flight fetch settles.
            self.state.send_modify(|s| s.last_signal = Some(signal));
            return;
        }

        self.deadline = Some(self.next_deadline(signal.immediate));
        self.state.send_modify(|s| {
            s.phase = Phase::PendingFlush;
            s.last_signal = Some(signal);
        });
    }

    fn next_deadline(&self, immediate: bool) -> Instant {
        if immediate {
            Instant::now()
        } else {
            Instant::now() + self.topic.debounce
        }
    }

    /// Run one fetch for the buffered burst. Returns `false` when the bus
    /// was torn down while fetching.
    async fn flush(&mut self) -> bool {
        self.deadline = None;
        let Some(pending) = self.pending.take() else {
            self.state.send_modify(|s| s.phase = Phase::Idle);
            return true;
        };

        let previous = self.last_processed;
        let mut processed = previous;
        processed.merge(&pending.seen);
        self.last_processed = processed;
        self.state.send_modify(|s| {
            s.phase = Phase::Fetching;
            s.fetch_count += 1;
            s.last_processed = processed;
        });

        let signal = pending.latest;
        tracing::debug!(
            topic = %self.topic.name,
            timestamp = signal.timestamp,
            source = signal.source.as_str(),
            collapsed = pending.count,
            "Flushing sync bus",
        );

        let result = {
            let fetcher = Arc::clone(&self.fetcher);
            let cancel = self.cancel.clone();
            let fetch = fetcher.fetch(&signal);
            tokio::pin!(fetch);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!(topic = %self.topic.name, "Discarding in-flight fetch");
                        return false;
                    }
                    received = self.signals.recv(), if self.signals_open => match received {
                        Some(next) => self.accept(next),
                        None => self.signals_open = false,
                    },
                    result = &mut fetch => break result,
                }
            }
        };

        match result {
            Ok(output) => {
                self.state.send_modify(|s| s.last_error = None);
                // No subscribers is fine.
                let _ = self.updates.send(SyncUpdate { signal, output });
            }
            Err(e) => {
                tracing::warn!(topic = %self.topic.name, error = %e, "Sync fetch failed");
                // Let the next heartbeat retry the same marker.
                self.last_processed = previous;
                self.state.send_modify(|s| {
                    s.last_error = Some(e.to_string());
                    s.last_processed = previous;
                });
            }
        }

        match self.pending.as_ref().map(|p| p.latest.immediate) {
            Some(immediate) => {
                self.deadline = Some(self.next_deadline(immediate));
                self.state.send_modify(|s| s.phase = Phase::PendingFlush);
            }
            None => self.state.send_modify(|s| s.phase = Phase::Idle),
        }
        true
    }
}

/// Sending half of a bus, without ownership of its lifetime.
///
/// Input channels hold one of these so they never keep a bus alive.
#[derive(Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<Signal>,
    cancel: CancellationToken,
}

impl SignalSender {
    pub fn send(&self, signal: Signal) -> SyncResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Closed);
        }
        self.tx.send(signal).map_err(|_| SyncError::Closed)
    }

    /// Token cancelled when the bus is torn down.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Handle to a running [`SyncBus`].
pub struct SyncHandle<T> {
    topic: Arc<TopicConfig>,
    sender: SignalSender,
    state: watch::Receiver<BusState>,
    updates: broadcast::Sender<SyncUpdate<T>>,
    cancel: CancellationToken,
    _teardown: Arc<DropGuard>,
}

impl<T> Clone for SyncHandle<T> {
    fn clone(&self) -> Self {
        Self {
            topic: Arc::clone(&self.topic),
            sender: self.sender.clone(),
            state: self.state.clone(),
            updates: self.updates.clone(),
            cancel: self.cancel.clone(),
            _teardown: Arc::clone(&self._teardown),
        }
    }
}

impl<T> SyncHandle<T> {
    pub fn topic(&self) -> &TopicConfig {
        &self.topic
    }

    pub fn signal(&self, signal: Signal) -> SyncResult<()> {
        self.sender.send(signal)
    }

    pub fn sender(&self) -> SignalSender {
        self.sender.clone()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> BusState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<BusState> {
        self.state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncUpdate<T>> {
        self.updates.subscribe()
    }

    /// Wait until the state satisfies `predicate`. Returns the last state
    /// seen if the bus stops first.
    pub async fn wait_until(&self, mut predicate: impl FnMut(&BusState) -> bool) -> BusState {
        let mut rx = self.state.clone();
        let result = rx.wait_for(|s| predicate(s)).await.map(|s| s.clone());
        match result {
            Ok(state) => state,
            Err(_) => rx.borrow().clone(),
        }
    }

    /// Stop the bus. A pending deadline is dropped and an in-flight fetch
    /// is aborted without publishing its result.
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use crate::signal::SignalSource;
    use crate::testing::RecordingFetcher;

    fn signal(timestamp: EpochMillis) -> Signal {
        Signal::new(timestamp, SignalSource::Manual)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_fetch_with_latest_signal() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());

        for ts in 1..=5 {
            handle
                .signal(signal(ts).with_action(format!("write-{ts}")))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(handle.state().phase, Phase::PendingFlush);
        settle().await;

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].timestamp, 5);
        assert_eq!(calls[0].action, "write-5");

        let state = handle.state();
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.fetch_count, 1);
        assert_eq!(state.last_processed.client, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn each_signal_resets_the_deadline() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::boat_models(), fetcher.clone());

        handle.signal(signal(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.signal(signal(2)).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        // 800 ms after the first signal, 400 ms after the second.
        assert!(fetcher.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_timestamp_is_processed_once() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());

        handle.signal(signal(10)).unwrap();
        settle().await;
        handle
            .signal(signal(10).with_source(SignalSource::Heartbeat))
            .unwrap();
        handle.signal(signal(9)).unwrap();
        settle().await;

        assert_eq!(fetcher.calls().len(), 1);
        assert_eq!(handle.state().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn signals_during_fetch_trigger_one_trailing_fetch() {
        let fetcher = RecordingFetcher::with_delay(Duration::from_secs(3));
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());

        handle.signal(signal(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(handle.state().phase, Phase::Fetching);

        handle.signal(signal(2)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.signal(signal(3)).unwrap();
        assert_eq!(handle.state().phase, Phase::Fetching);

        tokio::time::sleep(Duration::from_secs(10)).await;

        let timestamps: Vec<_> = fetcher.calls().iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![1, 3]);
        assert_eq!(fetcher.max_in_flight(), 1);
        assert_eq!(handle.state().last_processed.client, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn realtime_write_is_not_hidden_by_a_client_clock_running_ahead() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());

        // Local write stamped by a client clock one second ahead.
        handle
            .signal(Signal::new(1_700_000_002_000, SignalSource::Storage))
            .unwrap();
        settle().await;
        // A later write elsewhere, stamped by the database.
        handle
            .signal(Signal::new(1_700_000_001_000, SignalSource::Realtime))
            .unwrap();
        settle().await;

        assert_eq!(fetcher.calls().len(), 2);
        let state = handle.state();
        assert_eq!(state.last_processed.client, Some(1_700_000_002_000));
        assert_eq!(state.last_processed.database, Some(1_700_000_001_000));

        // Each clock still dedupes on its own watermark.
        handle
            .signal(Signal::new(1_700_000_001_000, SignalSource::Realtime))
            .unwrap();
        handle
            .signal(Signal::new(1_700_000_002_000, SignalSource::Heartbeat))
            .unwrap();
        settle().await;
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_signal_skips_debounce() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());

        handle.signal(signal(1).immediate(true)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_fetch_is_broadcast() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::options(), fetcher.clone());
        let mut updates = handle.subscribe();

        handle.signal(signal(42)).unwrap();
        let update = updates.recv().await.unwrap();
        assert_eq!(update.output, 42);
        assert_eq!(update.signal.timestamp, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_is_recorded_and_retried_by_next_signal() {
        let fetcher = RecordingFetcher::new();
        fetcher.set_failing(true);
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());

        handle.signal(signal(7)).unwrap();
        settle().await;
        let state = handle.state();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.last_error.is_some());
        assert_eq!(state.last_processed, Watermarks::default());

        fetcher.set_failing(false);
        handle
            .signal(signal(7).with_source(SignalSource::Heartbeat))
            .unwrap();
        settle().await;

        let state = handle.state();
        assert_eq!(fetcher.calls().len(), 2);
        assert_eq!(state.last_error, None);
        assert_eq!(state.last_processed.client, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_drops_pending_deadline() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());

        handle.signal(signal(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.teardown();
        settle().await;

        assert!(fetcher.calls().is_empty());
        assert!(handle.is_closed());
        assert_matches!(handle.signal(signal(2)), Err(SyncError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_discards_in_flight_result() {
        let fetcher = RecordingFetcher::with_delay(Duration::from_secs(5));
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());
        let mut updates = handle.subscribe();

        handle.signal(signal(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.state().phase, Phase::Fetching);

        handle.teardown();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_matches!(
            updates.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        );
        assert_eq!(handle.state().phase, Phase::Idle);
        assert_eq!(handle.state().fetch_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_the_bus() {
        let fetcher = RecordingFetcher::new();
        let handle = SyncBus::spawn(TopicConfig::dealer_pricing(), fetcher.clone());
        let sender = handle.sender();

        drop(handle);
        assert!(sender.cancellation_token().is_cancelled());
        assert_matches!(sender.send(signal(1)), Err(SyncError::Closed));
    }
}

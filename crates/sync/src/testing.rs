//! Test fetchers shared by the unit tests of this crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dealerhub_core::types::EpochMillis;

use crate::bus::Fetcher;
use crate::error::{SyncError, SyncResult};
use crate::signal::Signal;

/// Records every signal it is asked to fetch for and answers with the
/// signal's timestamp after an optional delay.
#[derive(Clone, Default)]
pub struct RecordingFetcher {
    calls: Arc<Mutex<Vec<Signal>>>,
    delay: Duration,
    failing: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Signal> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    type Output = EpochMillis;

    async fn fetch(&self, signal: &Signal) -> SyncResult<EpochMillis> {
        self.calls.lock().unwrap().push(signal.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Status {
                status: 500,
                message: "Internal server error".to_string(),
            });
        }
        Ok(signal.timestamp)
    }
}

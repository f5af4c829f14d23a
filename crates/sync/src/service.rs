//! Per-tab wiring of the four topic buses.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::bus::{SyncBus, SyncHandle};
use crate::channels;
use crate::client::{
    AdminDataClient, ApiClient, ClientDealerConfig, DealerConfigClient, PricingClient,
    PricingSaved, PricingWrite,
};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::notify::notify_update;
use crate::page::PageEvents;
use crate::signal::Signal;
use crate::storage::SharedStorage;
use crate::toast::{watch_updates, Toast, ToastCenter};
use crate::topic::TopicConfig;

/// Everything a tab shares with the rest of the browser profile, plus its
/// own event target.
#[derive(Clone)]
pub struct TabContext {
    pub tab_id: String,
    pub storage: Arc<SharedStorage>,
    pub page: PageEvents,
    /// Dealer the tab acts for. `None` for admin tabs.
    pub dealer_id: Option<String>,
}

impl TabContext {
    /// A new tab with a random id.
    pub fn new(storage: Arc<SharedStorage>, dealer_id: Option<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), storage, dealer_id)
    }

    pub fn with_id(
        tab_id: impl Into<String>,
        storage: Arc<SharedStorage>,
        dealer_id: Option<String>,
    ) -> Self {
        Self {
            tab_id: tab_id.into(),
            storage,
            page: PageEvents::new(),
            dealer_id,
        }
    }
}

/// The sync buses of one tab.
pub struct SyncService {
    ctx: TabContext,
    config: SyncConfig,
    admin_data: SyncHandle<Value>,
    boat_models: SyncHandle<ClientDealerConfig>,
    options: SyncHandle<ClientDealerConfig>,
    dealer_pricing: SyncHandle<ClientDealerConfig>,
    pricing: PricingClient,
    toasts: Arc<ToastCenter>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncService {
    /// Spawn the four buses for `ctx` and attach their channels.
    pub fn start(ctx: TabContext, config: SyncConfig) -> Self {
        let api = ApiClient::new(config.clone());
        let dealer_config = DealerConfigClient::new(api.clone(), ctx.dealer_id.clone());

        let admin_data = SyncBus::spawn(TopicConfig::admin_data(), AdminDataClient::new(api.clone()));
        let boat_models = SyncBus::spawn(TopicConfig::boat_models(), dealer_config.clone());
        let options = SyncBus::spawn(TopicConfig::options(), dealer_config.clone());
        let dealer_pricing = SyncBus::spawn(TopicConfig::dealer_pricing(), dealer_config);

        let toasts = Arc::new(ToastCenter::default());
        let mut tasks = Vec::new();
        tasks.extend(channels::attach(&admin_data, &ctx, &config));
        tasks.extend(channels::attach(&boat_models, &ctx, &config));
        tasks.extend(channels::attach(&options, &ctx, &config));
        tasks.extend(channels::attach(&dealer_pricing, &ctx, &config));
        tasks.push(watch_updates(&admin_data, Arc::clone(&toasts)));
        tasks.push(watch_updates(&boat_models, Arc::clone(&toasts)));
        tasks.push(watch_updates(&options, Arc::clone(&toasts)));
        tasks.push(watch_updates(&dealer_pricing, Arc::clone(&toasts)));

        tracing::info!(
            tab_id = %ctx.tab_id,
            dealer_id = ?ctx.dealer_id,
            realtime = config.realtime,
            "Sync service started",
        );

        Self {
            pricing: PricingClient::new(api),
            ctx,
            config,
            admin_data,
            boat_models,
            options,
            dealer_pricing,
            toasts,
            tasks,
        }
    }

    pub fn context(&self) -> &TabContext {
        &self.ctx
    }

    pub fn admin_data(&self) -> &SyncHandle<Value> {
        &self.admin_data
    }

    pub fn boat_models(&self) -> &SyncHandle<ClientDealerConfig> {
        &self.boat_models
    }

    pub fn options(&self) -> &SyncHandle<ClientDealerConfig> {
        &self.options
    }

    pub fn dealer_pricing(&self) -> &SyncHandle<ClientDealerConfig> {
        &self.dealer_pricing
    }

    pub fn toasts(&self) -> &Arc<ToastCenter> {
        &self.toasts
    }

    /// Announce a local write on `topic` to every tab.
    pub fn notify(&self, topic: &TopicConfig) -> Signal {
        notify_update(
            &self.ctx,
            topic,
            self.ctx.dealer_id.clone(),
            self.config.synthetic_storage_delay,
        )
    }

    /// Save a dealer override and announce it.
    ///
    /// A failed save produces an error toast carrying the server's message
    /// and is returned to the caller; nothing is announced.
    pub async fn save_pricing(&self, write: &PricingWrite) -> SyncResult<PricingSaved> {
        match self.pricing.save(write).await {
            Ok(saved) => {
                notify_update(
                    &self.ctx,
                    &TopicConfig::dealer_pricing(),
                    Some(saved.sync_metadata.dealer_id.clone()),
                    self.config.synthetic_storage_delay,
                );
                Ok(saved)
            }
            Err(e) => {
                let message = match &e {
                    SyncError::Status { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                tracing::warn!(item_id = %write.item_id, error = %e, "Pricing save failed");
                self.toasts.push(Toast::error("Could not save price", message));
                Err(e)
            }
        }
    }

    /// Tear down every bus and stop the channel tasks.
    pub async fn shutdown(self) {
        self.admin_data.teardown();
        self.boat_models.teardown();
        self.options.teardown();
        self.dealer_pricing.teardown();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Sync task ended abnormally");
            }
        }
        tracing::info!(tab_id = %self.ctx.tab_id, "Sync service stopped");
    }
}

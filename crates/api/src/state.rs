use std::sync::Arc;

use dealerhub_core::pricing::DealerConfig;
use dealerhub_core::sync::{ADMIN_DATA_TABLES, DEALER_CONFIG_TABLES};
use dealerhub_db::models::catalog::CatalogItem;
use dealerhub_db::DbPool;
use dealerhub_events::EventBus;

use crate::cache::StalenessOracle;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::admin_data::AdminData;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; inner data is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, absent when no `DATABASE_URL` was given.
    pub pool: Option<DbPool>,
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Row changes republished from the database.
    pub event_bus: Arc<EventBus>,
    pub dealer_config_cache: Arc<StalenessOracle<DealerConfig<CatalogItem>>>,
    pub admin_cache: Arc<StalenessOracle<AdminData>>,
}

impl AppState {
    pub fn new(pool: Option<DbPool>, config: ServerConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            ws_manager: Arc::new(WsManager::new()),
            event_bus: Arc::new(EventBus::default()),
            dealer_config_cache: Arc::new(StalenessOracle::new(DEALER_CONFIG_TABLES)),
            admin_cache: Arc::new(StalenessOracle::new(ADMIN_DATA_TABLES)),
        }
    }

    /// The pool, or [`AppError::NotConfigured`] before any query is made.
    pub fn pool(&self) -> AppResult<&DbPool> {
        self.pool.as_ref().ok_or(AppError::NotConfigured)
    }
}

use std::time::Duration;

use crate::feed::ReconnectConfig;

/// Client-side sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// API base URL, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// Period of the storage-marker heartbeat poll (default: 10 s).
    pub heartbeat_interval: Duration,
    /// Delay before the synthetic storage event that follows a local write
    /// (default: 100 ms).
    pub synthetic_storage_delay: Duration,
    /// Whether to open the realtime websocket feed for each topic.
    pub realtime: bool,
    pub reconnect: ReconnectConfig,
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            heartbeat_interval: Duration::from_secs(10),
            synthetic_storage_delay: Duration::from_millis(100),
            realtime: true,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `SYNC_BASE_URL`         | `http://localhost:3000` |
    /// | `SYNC_HEARTBEAT_SECS`   | `10`                    |
    /// | `SYNC_REALTIME`         | `true`                  |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("SYNC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        let heartbeat_secs: u64 = std::env::var("SYNC_HEARTBEAT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("SYNC_HEARTBEAT_SECS must be a valid u64");
        let realtime = std::env::var("SYNC_REALTIME")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Self {
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            realtime,
            ..Self::new(base_url)
        }
    }

    /// URL of an API route, e.g. `api_url("/dealer-config")`.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Websocket URL of the realtime change feed.
    pub fn ws_url(&self) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{base}/api/v1/ws")
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_derive_from_base() {
        let config = SyncConfig::new("https://portal.test/");
        assert_eq!(config.api_url("/dealer-config"), "https://portal.test/api/v1/dealer-config");
        assert_eq!(config.ws_url(), "wss://portal.test/api/v1/ws");

        let config = SyncConfig::new("http://localhost:3000");
        assert_eq!(config.ws_url(), "ws://localhost:3000/api/v1/ws");
    }

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.synthetic_storage_delay, Duration::from_millis(100));
        assert!(config.realtime);
    }
}

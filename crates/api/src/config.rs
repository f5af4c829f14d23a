use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on waiting for background tasks at shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Postgres URL. `None` starts the server in not-configured mode where
    /// every data endpoint answers 503.
    pub database_url: Option<String>,
    pub cache: CacheConfig,
}

/// TTLs and windows for the response caches.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL of the admin aggregate cache.
    pub admin_ttl: Duration,
    /// TTL of a dealer config entry.
    pub dealer_config_ttl: Duration,
    /// TTL of a dealer config entry computed right after a pricing write.
    pub pricing_update_ttl: Duration,
    /// How old an `x-pricing-update-marker` may be and still count.
    pub pricing_marker_window: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            admin_ttl: Duration::from_millis(5000),
            dealer_config_ttl: Duration::from_millis(5000),
            pricing_update_ttl: Duration::from_millis(1000),
            pricing_marker_window: Duration::from_secs(30),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .map(|v| {
            v.trim()
                .parse()
                .unwrap_or_else(|_| panic!("{name} must be a valid u64"))
        })
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                    |
    /// | `DATABASE_URL`                | unset                   |
    /// | `ADMIN_CACHE_TTL_MS`          | `5000`                  |
    /// | `DEALER_CONFIG_CACHE_TTL_MS`  | `5000`                  |
    /// | `PRICING_UPDATE_CACHE_TTL_MS` | `1000`                  |
    /// | `PRICING_MARKER_WINDOW_SECS`  | `30`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let defaults = CacheConfig::default();
        let cache = CacheConfig {
            admin_ttl: Duration::from_millis(env_u64(
                "ADMIN_CACHE_TTL_MS",
                defaults.admin_ttl.as_millis() as u64,
            )),
            dealer_config_ttl: Duration::from_millis(env_u64(
                "DEALER_CONFIG_CACHE_TTL_MS",
                defaults.dealer_config_ttl.as_millis() as u64,
            )),
            pricing_update_ttl: Duration::from_millis(env_u64(
                "PRICING_UPDATE_CACHE_TTL_MS",
                defaults.pricing_update_ttl.as_millis() as u64,
            )),
            pricing_marker_window: Duration::from_secs(env_u64(
                "PRICING_MARKER_WINDOW_SECS",
                defaults.pricing_marker_window.as_secs(),
            )),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs: env_u64("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_u64("SHUTDOWN_TIMEOUT_SECS", 30),
            database_url,
            cache,
        }
    }
}

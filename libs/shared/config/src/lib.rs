use std::env;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing, honoring RUST_LOG when set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub postgrest_url: String,
    pub postgrest_api_key: String,
    /// How long a slot lock is honored before being treated as expired.
    pub lock_ttl_seconds: u64,
    /// Sweep interval for the expired-lock reaper.
    pub lock_reaper_interval_seconds: u64,
    /// Optional webhook endpoint for booking events.
    pub event_webhook_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            postgrest_url: env::var("POSTGREST_URL").unwrap_or_else(|_| {
                warn!("POSTGREST_URL not set, using empty value");
                String::new()
            }),
            postgrest_api_key: env::var("POSTGREST_API_KEY").unwrap_or_else(|_| {
                warn!("POSTGREST_API_KEY not set, using empty value");
                String::new()
            }),
            lock_ttl_seconds: env::var("LOCK_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            lock_reaper_interval_seconds: env::var("LOCK_REAPER_INTERVAL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            event_webhook_url: env::var("EVENT_WEBHOOK_URL").ok(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.postgrest_url.is_empty() && !self.postgrest_api_key.is_empty()
    }
}

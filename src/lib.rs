//! Gateway Resilience Layer
//!
//! Health aggregation, background gateway monitoring, failover, and response
//! caching wrapped around an opaque request-forwarding engine.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod middleware;

pub use error::{AppError, Result};

use std::sync::Arc;
use std::time::Duration;

use cache::CacheStore;
use config::Settings;
use gateway::{engine::ProxyEngine, failover::FailoverHandler};
use health::{aggregator::HealthAggregator, probe::ProbeClient};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub aggregator: HealthAggregator,
    pub engine: ProxyEngine,
    pub failover: FailoverHandler,
    pub cache_store: Arc<CacheStore>,
}

impl AppState {
    /// Wire up the resilience components from loaded settings
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let probe = ProbeClient::new()?;
        let aggregator = HealthAggregator::new(
            probe,
            env!("CARGO_PKG_VERSION").to_string(),
            settings.environment.clone(),
        );
        let engine = ProxyEngine::new(
            settings.routes.clone(),
            Duration::from_millis(settings.failover.request_timeout_ms),
        )?;
        let failover = FailoverHandler::new(&settings.failover)?;
        let cache_store = Arc::new(CacheStore::new(settings.cache.max_entries));

        Ok(Self {
            settings,
            aggregator,
            engine,
            failover,
            cache_store,
        })
    }
}

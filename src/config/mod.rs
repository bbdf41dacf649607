//! Configuration module - Typed settings loaded once at startup

pub mod settings;

pub use settings::{
    CacheConfig, DownstreamAddr, FailoverConfig, HealthCheckConfig, LoggingConfig, MonitorConfig,
    NamedEndpoint, RouteConfig, ServerConfig, Settings,
};

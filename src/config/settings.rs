//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub health: HealthCheckConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub failover: FailoverConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "Development".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// On-demand health check configuration: the fixed endpoint list probed by
/// the basic `/health` check, plus the per-probe timeout shared with the
/// detailed check.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default)]
    pub endpoints: Vec<NamedEndpoint>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            endpoints: vec![],
        }
    }
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

/// A named full health URL checked by the basic health check
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NamedEndpoint {
    pub name: String,
    pub url: String,
}

/// One logical service route: the upstream path prefix the gateway matches
/// and the downstream instances that serve it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    pub service_name: String,
    pub upstream_path_prefix: String,
    pub downstreams: Vec<DownstreamAddr>,
}

/// Downstream instance address
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownstreamAddr {
    pub host: String,
    pub port: u16,
}

impl DownstreamAddr {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Failover configuration: ordered fallback gateway base URLs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailoverConfig {
    #[serde(default)]
    pub fallback_gateways: Vec<String>,
    #[serde(default = "default_failover_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            fallback_gateways: vec![],
            request_timeout_ms: default_failover_timeout_ms(),
        }
    }
}

fn default_failover_timeout_ms() -> u64 {
    5000
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_duration_secs")]
    pub duration_secs: u64,
    #[serde(default = "default_vary_by_headers")]
    pub vary_by_headers: Vec<String>,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_secs: default_cache_duration_secs(),
            vary_by_headers: default_vary_by_headers(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_duration_secs() -> u64 {
    10
}

fn default_vary_by_headers() -> Vec<String> {
    vec!["Accept".to_string(), "Accept-Language".to_string()]
}

fn default_max_entries() -> usize {
    10_000
}

/// Background gateway monitor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_primary_gateway_url")]
    pub primary_gateway_url: String,
    #[serde(default)]
    pub backup_gateway_urls: Vec<String>,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            primary_gateway_url: default_primary_gateway_url(),
            backup_gateway_urls: vec![],
            check_interval_secs: default_check_interval_secs(),
            timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_primary_gateway_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_check_interval_secs() -> u64 {
    30
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("environment", "Development")?
            // Load from configuration file
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default"))
                    .required(false),
            )
            // Override with environment variables (prefixed with GATEWAY_)
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Server port cannot be 0".to_string(),
            )));
        }

        for route in &self.routes {
            if route.service_name.is_empty() {
                return Err(AppError::Config(config::ConfigError::Message(
                    "Route service name cannot be empty".to_string(),
                )));
            }
            if route.downstreams.is_empty() {
                return Err(AppError::Config(config::ConfigError::Message(format!(
                    "Route '{}' must have at least one downstream",
                    route.service_name
                ))));
            }
            if !route.upstream_path_prefix.starts_with('/') {
                return Err(AppError::Config(config::ConfigError::Message(format!(
                    "Route '{}' upstream path prefix must start with '/'",
                    route.service_name
                ))));
            }
        }

        for gateway in &self.failover.fallback_gateways {
            if gateway.is_empty() {
                return Err(AppError::Config(config::ConfigError::Message(
                    "Fallback gateway URL cannot be empty".to_string(),
                )));
            }
        }

        if self.cache.enabled && self.cache.duration_secs == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Cache duration must be at least 1 second when caching is enabled".to_string(),
            )));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            environment: default_environment(),
            health: HealthCheckConfig::default(),
            routes: vec![],
            failover: FailoverConfig::default(),
            cache: CacheConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.environment, "Development");
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.duration_secs, 10);
        assert_eq!(
            settings.cache.vary_by_headers,
            vec!["Accept".to_string(), "Accept-Language".to_string()]
        );
        assert_eq!(settings.monitor.check_interval_secs, 30);
        assert_eq!(settings.monitor.timeout_ms, 5000);
        assert_eq!(settings.health.probe_timeout_ms, 5000);
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_route_without_downstreams() {
        let mut settings = Settings::default();
        settings.routes.push(RouteConfig {
            service_name: "users".to_string(),
            upstream_path_prefix: "/api/users".to_string(),
            downstreams: vec![],
        });
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_path_prefix() {
        let mut settings = Settings::default();
        settings.routes.push(RouteConfig {
            service_name: "users".to_string(),
            upstream_path_prefix: "api/users".to_string(),
            downstreams: vec![DownstreamAddr {
                host: "localhost".to_string(),
                port: 5001,
            }],
        });
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cache_duration() {
        let mut settings = Settings::default();
        settings.cache.duration_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_downstream_base_url() {
        let addr = DownstreamAddr {
            host: "localhost".to_string(),
            port: 5001,
        };
        assert_eq!(addr.base_url(), "http://localhost:5001");
    }
}

//! Health aggregator: fans configured endpoints through the probe client and
//! reduces per-instance results into service and gateway level status.
//!
//! Probing is strictly sequential, in configuration order. Response ordering
//! matches probe ordering.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::config::{HealthCheckConfig, RouteConfig};
use crate::health::probe::{ProbeClient, ProbeStatus};

/// Three-way aggregate status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggregateStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl AggregateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateStatus::Healthy => "Healthy",
            AggregateStatus::Degraded => "Degraded",
            AggregateStatus::Unhealthy => "Unhealthy",
        }
    }

    /// HTTP status for a health check response carrying this aggregate.
    /// Only a fully unhealthy aggregate maps to 503.
    pub fn http_status(&self) -> u16 {
        match self {
            AggregateStatus::Unhealthy => 503,
            _ => 200,
        }
    }
}

/// Per-endpoint result of the basic check
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicServiceHealth {
    pub service_name: String,
    pub endpoint: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time: DateTime<Utc>,
}

/// Body of the basic `/health` response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicHealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub services: Vec<BasicServiceHealth>,
    #[serde(skip)]
    pub aggregate: AggregateStatus,
}

/// One probed downstream instance of the detailed check
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHealth {
    pub host: String,
    pub port: u16,
    pub service_name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub response_time: DateTime<Utc>,
    pub response_time_ms: u64,
    #[serde(skip)]
    pub healthy: bool,
}

/// Per-service grouping of instance results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealthGroup {
    pub service_name: String,
    pub overall_status: &'static str,
    pub healthy_instances: usize,
    pub total_instances: usize,
    pub instances: Vec<InstanceHealth>,
    #[serde(skip)]
    pub healthy: bool,
}

/// Gateway-level header of the detailed response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayInfo {
    pub status: &'static str,
    pub version: String,
    pub environment: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of the `/health/detailed` response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub gateway: GatewayInfo,
    pub downstream_services: Vec<ServiceHealthGroup>,
    #[serde(skip)]
    pub aggregate: AggregateStatus,
}

/// Reduce a flat list of probe statuses into the basic check aggregate.
///
/// The original gateway's branching here made its Unhealthy arm unreachable
/// (any failure short-circuited into Degraded). We use the fixed three-way
/// split: Unhealthy only when every instance fails, Degraded when some do.
pub fn reduce_basic(statuses: &[ProbeStatus]) -> AggregateStatus {
    let total = statuses.len();
    let failing = statuses.iter().filter(|s| !s.is_healthy()).count();

    if failing == 0 {
        AggregateStatus::Healthy
    } else if failing == total {
        AggregateStatus::Unhealthy
    } else {
        AggregateStatus::Degraded
    }
}

/// Reduce per-service groups into the gateway aggregate: Healthy if all
/// groups are healthy, Unhealthy if none are, Degraded otherwise.
pub fn reduce_gateway(groups: &[ServiceHealthGroup]) -> AggregateStatus {
    let healthy = groups.iter().filter(|g| g.healthy).count();

    if healthy == groups.len() {
        AggregateStatus::Healthy
    } else if healthy > 0 {
        AggregateStatus::Degraded
    } else {
        AggregateStatus::Unhealthy
    }
}

/// On-demand health aggregator backing the `/health` endpoints
#[derive(Clone)]
pub struct HealthAggregator {
    probe: ProbeClient,
    version: String,
    environment: String,
}

impl HealthAggregator {
    pub fn new(probe: ProbeClient, version: String, environment: String) -> Self {
        Self {
            probe,
            version,
            environment,
        }
    }

    /// Basic check: probe the fixed configured endpoint list sequentially
    pub async fn check_basic(&self, config: &HealthCheckConfig) -> BasicHealthResponse {
        let timeout = Duration::from_millis(config.probe_timeout_ms);
        let mut services = Vec::with_capacity(config.endpoints.len());
        let mut statuses = Vec::with_capacity(config.endpoints.len());

        for endpoint in &config.endpoints {
            let result = self.probe.probe(&endpoint.url, timeout).await;
            if !result.status.is_healthy() {
                tracing::warn!(
                    service = %endpoint.name,
                    endpoint = %endpoint.url,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "Health check failed"
                );
            }
            statuses.push(result.status);
            services.push(BasicServiceHealth {
                service_name: endpoint.name.clone(),
                endpoint: endpoint.url.clone(),
                status: result.status.as_str(),
                error: result.error,
                response_time: Utc::now(),
            });
        }

        let aggregate = reduce_basic(&statuses);
        BasicHealthResponse {
            status: aggregate.as_str(),
            timestamp: Utc::now(),
            services,
            aggregate,
        }
    }

    /// Detailed check: probe every downstream of every configured route,
    /// group per service, then reduce to a gateway summary
    pub async fn check_detailed(
        &self,
        routes: &[RouteConfig],
        probe_timeout_ms: u64,
    ) -> DetailedHealthResponse {
        let timeout = Duration::from_millis(probe_timeout_ms);
        let mut groups = Vec::with_capacity(routes.len());

        for route in routes {
            let mut instances = Vec::with_capacity(route.downstreams.len());

            for downstream in &route.downstreams {
                let result = self.probe.probe_health(&downstream.base_url(), timeout).await;
                instances.push(InstanceHealth {
                    host: downstream.host.clone(),
                    port: downstream.port,
                    service_name: route.service_name.clone(),
                    status: result.status.as_str(),
                    error: result.error,
                    response_time: Utc::now(),
                    response_time_ms: result.response_time_ms,
                    healthy: result.status.is_healthy(),
                });
            }

            let healthy_instances = instances.iter().filter(|i| i.healthy).count();
            let healthy = healthy_instances > 0;
            groups.push(ServiceHealthGroup {
                service_name: route.service_name.clone(),
                overall_status: if healthy { "Healthy" } else { "Unhealthy" },
                healthy_instances,
                total_instances: instances.len(),
                instances,
                healthy,
            });
        }

        let aggregate = reduce_gateway(&groups);
        DetailedHealthResponse {
            gateway: GatewayInfo {
                status: aggregate.as_str(),
                version: self.version.clone(),
                environment: self.environment.clone(),
                timestamp: Utc::now(),
            },
            downstream_services: groups,
            aggregate,
        }
    }
}

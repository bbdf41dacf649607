//! Background gateway monitor.
//!
//! Periodically probes the primary gateway and its backups, and raises an
//! alert through the alerting sink when every instance is down. Per-instance
//! probe failures are recorded, never fatal; only a shutdown signal ends the
//! loop.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::health::probe::ProbeClient;

/// Role of a monitored gateway instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceKind {
    Primary,
    Backup,
}

impl InstanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceKind::Primary => "Primary",
            InstanceKind::Backup => "Backup",
        }
    }
}

/// Health of one gateway instance for one poll cycle
#[derive(Debug, Clone)]
pub struct GatewayInstanceHealth {
    pub kind: InstanceKind,
    pub url: String,
    pub is_healthy: bool,
    pub response_time_ms: u64,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// One poll cycle's report, not retained beyond logging
#[derive(Debug, Clone)]
pub struct GatewayHealthReport {
    pub timestamp: DateTime<Utc>,
    pub instances: Vec<GatewayInstanceHealth>,
}

impl GatewayHealthReport {
    pub fn healthy_count(&self) -> usize {
        self.instances.iter().filter(|i| i.is_healthy).count()
    }
}

/// Sink for composed alert messages. Delivery (paging, email) lives outside
/// this layer; the default sink hands the message to the logging pipeline.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn critical(&self, message: &str);
}

/// Alert sink backed by the tracing pipeline
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn critical(&self, message: &str) {
        error!(alert = %message, "CRITICAL: All API gateway instances are down");
    }
}

/// Long-lived poller of the primary and backup gateway instances
pub struct GatewayHealthMonitor {
    probe: ProbeClient,
    config: MonitorConfig,
    alerts: Arc<dyn AlertSink>,
}

impl GatewayHealthMonitor {
    pub fn new(probe: ProbeClient, config: MonitorConfig) -> Self {
        Self::with_alert_sink(probe, config, Arc::new(LogAlertSink))
    }

    pub fn with_alert_sink(
        probe: ProbeClient,
        config: MonitorConfig,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            probe,
            config,
            alerts,
        }
    }

    /// Run until the shutdown channel fires. The inter-cycle wait is a
    /// select over the sleep and the shutdown receiver, so shutdown never
    /// waits out a full interval.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let interval = Duration::from_secs(self.config.check_interval_secs);
        info!(
            interval_secs = self.config.check_interval_secs,
            primary = %self.config.primary_gateway_url,
            backups = self.config.backup_gateway_urls.len(),
            "Gateway health monitor starting"
        );

        loop {
            if !shutdown.is_empty() {
                break;
            }

            let report = self.poll_once().await;
            self.report_status(&report).await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.recv() => {
                    break;
                }
            }
        }

        info!("Gateway health monitor shutting down");
    }

    /// Probe the primary, then each backup in configured order
    pub async fn poll_once(&self) -> GatewayHealthReport {
        let mut instances = Vec::with_capacity(1 + self.config.backup_gateway_urls.len());

        instances.push(
            self.check_instance(InstanceKind::Primary, &self.config.primary_gateway_url)
                .await,
        );
        for backup_url in &self.config.backup_gateway_urls {
            instances.push(self.check_instance(InstanceKind::Backup, backup_url).await);
        }

        GatewayHealthReport {
            timestamp: Utc::now(),
            instances,
        }
    }

    async fn check_instance(&self, kind: InstanceKind, url: &str) -> GatewayInstanceHealth {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let result = self.probe.probe_health(url, timeout).await;

        // A transport fault measured nothing useful; record the configured
        // timeout as the response time instead. An HTTP-unhealthy response
        // still carries real latency.
        let response_time_ms = if result.status_code.is_some() {
            result.response_time_ms
        } else {
            self.config.timeout_ms
        };

        GatewayInstanceHealth {
            kind,
            url: url.to_string(),
            is_healthy: result.status.is_healthy(),
            response_time_ms,
            status_code: result.status_code,
            error: result.error,
            checked_at: Utc::now(),
        }
    }

    /// Log the cycle outcome; total outage goes through the alert sink
    pub async fn report_status(&self, report: &GatewayHealthReport) {
        let healthy = report.healthy_count();
        let total = report.instances.len();

        info!(healthy, total, "Gateway health: {}/{} instances healthy", healthy, total);

        if healthy == 0 {
            self.alerts.critical(&compose_outage_alert(report)).await;
        } else if healthy < total {
            warn!(
                unhealthy = total - healthy,
                "{} gateway instances are unhealthy",
                total - healthy
            );
        }
    }
}

/// Compose the multi-line total-outage alert, enumerating every failed
/// instance with its recorded error
pub fn compose_outage_alert(report: &GatewayHealthReport) -> String {
    let mut lines = vec![
        "CRITICAL ALERT: All API gateway instances down".to_string(),
        format!("Time: {}", report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")),
        "Failed instances:".to_string(),
    ];

    for instance in &report.instances {
        lines.push(format!(
            "- {}: {} - {}",
            instance.kind.as_str(),
            instance.url,
            instance.error.as_deref().unwrap_or("unknown error")
        ));
    }

    lines.push("Immediate action required".to_string());
    lines.join("\n")
}

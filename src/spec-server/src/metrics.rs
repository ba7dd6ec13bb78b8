//! Best-effort metrics sink.
//!
//! Metrics never fail a request: every emission path swallows its own errors.

use crate::config::MetricsConfig;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;

const METRIC_PREFIX: &str = "otm_spec_server";

pub trait MetricsSink: Send + Sync {
    /// One inbound request.
    fn request(&self, verb: &str, request_type: Option<&str>, version: Option<&str>);

    /// One file or tag-list lookup, served from cache or upstream.
    fn upstream_resource(&self, file: &str, version: &str, from_cache: bool, status: Option<u16>);

    /// Free-form lifecycle event.
    fn event(&self, title: &str, text: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn request(&self, _verb: &str, _request_type: Option<&str>, _version: Option<&str>) {}

    fn upstream_resource(&self, _file: &str, _version: &str, _from_cache: bool, _status: Option<u16>) {}

    fn event(&self, _title: &str, _text: &str) {}
}

/// DogStatsD emitter over UDP.
pub struct StatsdMetrics {
    socket: UdpSocket,
    target: SocketAddr,
    environment: String,
    hostname: String,
}

impl StatsdMetrics {
    pub fn new(target: &str, environment: &str) -> std::io::Result<Self> {
        let target = target.to_socket_addrs()?.next().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("statsd address {} did not resolve", target),
            )
        })?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
        Ok(Self {
            socket,
            target,
            environment: environment.to_string(),
            hostname,
        })
    }

    fn increment(&self, metric: &str, tags: &[String]) {
        let line = format!("{}.{}:1|c|#{}", METRIC_PREFIX, metric, tags.join(","));
        self.send(&line);
    }

    fn send(&self, line: &str) {
        if let Err(e) = self.socket.send_to(line.as_bytes(), self.target) {
            tracing::debug!(target_addr = %self.target, error = %e, "Dropped metrics datagram");
        }
    }

    fn environment_tag(&self) -> String {
        format!("environment:{}", self.environment)
    }
}

impl MetricsSink for StatsdMetrics {
    fn request(&self, verb: &str, request_type: Option<&str>, version: Option<&str>) {
        let mut tags = vec![format!("verb:{}", verb), self.environment_tag()];
        if let Some(request_type) = request_type {
            tags.push(format!("type:{}", request_type));
        }
        if let Some(version) = version {
            tags.push(format!("version:{}", version));
        }
        self.increment("http.requests", &tags);
    }

    fn upstream_resource(&self, file: &str, version: &str, from_cache: bool, status: Option<u16>) {
        let mut tags = vec![
            format!("file:{}", file),
            format!("version:{}", version),
            format!("from_cache:{}", from_cache),
            self.environment_tag(),
        ];
        if let Some(status) = status {
            tags.push(format!("status_code:{}", status));
        }
        self.increment("github_resource", &tags);
    }

    fn event(&self, title: &str, text: &str) {
        let line = format!(
            "_e{{{},{}}}:{}|{}|h:{}|k:{}|#{},{}",
            title.len(),
            text.len(),
            title,
            text,
            self.hostname,
            METRIC_PREFIX,
            self.environment_tag(),
            METRIC_PREFIX
        );
        self.send(&line);
    }
}

/// Pick the sink for this process. Falls back to the no-op sink when metrics
/// are disabled or the socket cannot be created.
pub fn metrics_from_config(config: &MetricsConfig) -> Arc<dyn MetricsSink> {
    if !config.enabled {
        tracing::debug!("Metrics disabled, using no-op sink");
        return Arc::new(NoopMetrics);
    }
    match StatsdMetrics::new(&config.statsd_address, &config.environment) {
        Ok(sink) => {
            tracing::info!(
                statsd_address = %config.statsd_address,
                environment = %config.environment,
                "Metrics enabled"
            );
            Arc::new(sink)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create metrics socket, metrics disabled");
            Arc::new(NoopMetrics)
        }
    }
}

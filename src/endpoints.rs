//! Mediator endpoint discovery.
//!
//! Each attached browser runs one mediator process listening on a local
//! port inside a fixed, contiguous range. Discovery probes every port in
//! the range with a cheap bounded connect and assigns single-letter
//! prefixes in port order, so the same browser keeps the same prefix
//! across runs as long as the set of live ports is stable.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

const PREFIXES: &str = "abcdefghijklmnopqrstuvwxyz";

/// One reachable mediator: a prefix letter plus its network address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub prefix: char,
    pub host: String,
    pub port: u16,
}

impl EndpointDescriptor {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub host: String,
    pub base_port: u16,
    pub port_count: u16,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            base_port: 4625,
            port_count: 10,
            probe_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl DiscoveryConfig {
    /// Defaults overridden by `TABCTL_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(host) = dotenvy::var("TABCTL_HOST") {
            cfg.host = host;
        }
        if let Ok(val) = dotenvy::var("TABCTL_BASE_PORT")
            && let Ok(port) = val.parse::<u16>()
        {
            cfg.base_port = port;
        }
        if let Ok(val) = dotenvy::var("TABCTL_PORT_COUNT")
            && let Ok(count) = val.parse::<u16>()
        {
            cfg.port_count = count.min(PREFIXES.len() as u16);
        }
        if let Ok(val) = dotenvy::var("TABCTL_PROBE_TIMEOUT_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            cfg.probe_timeout = Duration::from_millis(ms);
        }
        if let Ok(val) = dotenvy::var("TABCTL_HTTP_TIMEOUT_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            cfg.request_timeout = Duration::from_millis(ms);
        }

        cfg
    }

    fn candidates(&self) -> impl Iterator<Item = (char, u16)> + '_ {
        // Inclusive upper bound: a base port near 65535 just yields a
        // shorter range instead of overflowing.
        PREFIXES
            .chars()
            .zip(self.base_port..=u16::MAX)
            .take(self.port_count as usize)
    }
}

/// Probe the configured port range and return the live endpoints in
/// prefix order. A refused or timed-out probe means "not alive", never
/// an error; there are no retries.
pub async fn discover(config: &DiscoveryConfig) -> Vec<EndpointDescriptor> {
    let mut alive = Vec::new();
    for (prefix, port) in config.candidates() {
        let addr = format!("{}:{}", config.host, port);
        match timeout(config.probe_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => {
                debug!(prefix = %prefix, addr = %addr, "endpoint alive");
                alive.push(EndpointDescriptor {
                    prefix,
                    host: config.host.clone(),
                    port,
                });
            }
            Ok(Err(err)) => debug!(addr = %addr, error = %err, "endpoint not alive"),
            Err(_) => debug!(addr = %addr, "probe timed out"),
        }
    }
    info!(count = alive.len(), "discovered endpoints");
    alive
}

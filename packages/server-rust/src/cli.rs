//! Command-line and environment configuration, and gateway assembly.
//!
//! Every flag also reads an `ESB_*` environment variable, so the same binary
//! runs from a shell or a container manifest.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use esb_core::{RoutingTable, ServiceRegistry, Upstreams};
use tracing::{info, warn};

use crate::client::HttpServiceClient;
use crate::network::{GatewayModule, NetworkConfig};
use crate::service::{HistoryBuffer, MessageRouter, RouterConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// ESB gateway: routes envelopes between collaborator services.
#[derive(Debug, Clone, Parser)]
#[command(name = "esb-server", version, about)]
pub struct Cli {
    #[arg(long, env = "ESB_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "ESB_PORT", default_value_t = 8001)]
    pub port: u16,

    /// Identity reported by the health endpoint.
    #[arg(long, env = "ESB_SERVICE_NAME", default_value = "esb-core")]
    pub service_name: String,

    #[arg(long, env = "ESB_USERS_URL", default_value = "http://users_service:8002")]
    pub users_url: String,

    #[arg(
        long,
        env = "ESB_MEMBERSHIPS_URL",
        default_value = "http://membership_service:8004"
    )]
    pub memberships_url: String,

    #[arg(long, env = "ESB_CATALOG_URL", default_value = "http://catalog_service:8003")]
    pub catalog_url: String,

    #[arg(
        long,
        env = "ESB_PROVIDERS_URL",
        default_value = "http://providers_service:8005"
    )]
    pub providers_url: String,

    /// Extra registry entry; repeatable. Overrides a default of the same name.
    #[arg(long = "service", value_name = "NAME=URL", value_parser = parse_service)]
    pub services: Vec<(String, String)>,

    /// JSON routing table replacing the built-in one.
    #[arg(long, env = "ESB_ROUTING_TABLE")]
    pub routing_table: Option<PathBuf>,

    #[arg(long, env = "ESB_HOP_TIMEOUT_MS", default_value_t = 10_000)]
    pub hop_timeout_ms: u64,

    #[arg(long, env = "ESB_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    #[arg(long, env = "ESB_HISTORY_CAPACITY", default_value_t = 100)]
    pub history_capacity: usize,

    #[arg(
        long = "cors-origin",
        env = "ESB_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "ESB_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    #[arg(long, env = "ESB_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

fn parse_service(raw: &str) -> Result<(String, String), String> {
    let (name, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=URL, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty service name in {raw:?}"));
    }
    Ok((name.to_string(), url.trim().to_string()))
}

/// Validated startup configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub network: NetworkConfig,
    pub router: RouterConfig,
    pub upstreams: Upstreams,
    pub registry: ServiceRegistry,
    pub table: RoutingTable,
}

impl Cli {
    /// Builds and validates the startup configuration.
    ///
    /// # Errors
    ///
    /// Fails on a non-absolute registry URL or an unreadable routing table.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let upstreams = Upstreams {
            users: self.users_url.clone(),
            memberships: self.memberships_url.clone(),
            catalog: self.catalog_url.clone(),
            providers: self.providers_url.clone(),
        };

        let mut registry = ServiceRegistry::from_upstreams(&upstreams)
            .context("invalid collaborator base URL")?;
        for (name, url) in &self.services {
            registry
                .insert(name.as_str(), url.as_str())
                .with_context(|| format!("invalid --service entry {name}"))?;
        }

        let table = match &self.routing_table {
            Some(path) => load_routing_table(path)?,
            None => RoutingTable::builtin(),
        };

        Ok(Settings {
            network: NetworkConfig {
                host: self.host.clone(),
                port: self.port,
                cors_origins: self.cors_origins.clone(),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                ..NetworkConfig::default()
            },
            router: RouterConfig {
                service_name: self.service_name.clone(),
                hop_timeout: Duration::from_millis(self.hop_timeout_ms),
                history_capacity: self.history_capacity,
                ..RouterConfig::default()
            },
            upstreams,
            registry,
            table,
        })
    }
}

/// Reads a routing table from a JSON file.
///
/// # Errors
///
/// Fails if the file cannot be read or does not parse, including unknown
/// transformer names.
pub fn load_routing_table(path: &Path) -> anyhow::Result<RoutingTable> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read routing table {}", path.display()))?;
    RoutingTable::from_json(&raw)
        .with_context(|| format!("failed to parse routing table {}", path.display()))
}

/// Wires the HTTP client, router, and history into an unbound gateway.
///
/// Table entries that reference unregistered services are logged, not
/// rejected.
///
/// # Errors
///
/// Fails if the HTTP client cannot be built.
pub fn build_gateway(settings: Settings) -> anyhow::Result<GatewayModule> {
    for warning in settings.table.check(&settings.registry) {
        warn!("{warning}");
    }
    info!(
        services = settings.registry.len(),
        rules = settings.table.len(),
        "routing configuration loaded"
    );

    let client = Arc::new(
        HttpServiceClient::new(settings.router.hop_timeout)
            .context("failed to build HTTP client")?,
    );
    let router = MessageRouter::new(
        Arc::new(settings.registry),
        Arc::new(settings.table),
        client.clone(),
        &settings.router,
    );

    Ok(GatewayModule::new(
        settings.network,
        Arc::new(router),
        Arc::new(HistoryBuffer::new(settings.router.history_capacity)),
        client,
        settings.upstreams,
        &settings.router.service_name,
    ))
}

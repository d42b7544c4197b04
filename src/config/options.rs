//! Raw, environment-sourced options. Nothing here is resolved; see [`plan`](crate::config::plan).

use crate::config::ConfigError;
use crate::customer_actor::CustomerSettings;
use crate::framework::{RegionSettings, DEFAULT_MAX_SHARDS};
use crate::lifecycle::SystemSettings;
use crate::producer_actor::ProducerSettings;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The cluster role this process plays. Every role hosts customers; frontends also produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Frontend,
    Backend,
}

impl Role {
    pub fn from_is_frontend(is_frontend: bool) -> Self {
        if is_frontend {
            Role::Frontend
        } else {
            Role::Backend
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Frontend => write!(f, "frontend"),
            Role::Backend => write!(f, "backend"),
        }
    }
}

/// How a node finds its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StartupMethod {
    /// A static seed node list.
    SeedNodes,
    /// Contact points listed in configuration.
    ConfigDiscovery,
    /// Contact points resolved through the platform orchestrator.
    KubernetesDiscovery,
}

impl FromStr for StartupMethod {
    type Err = ConfigError;

    /// Case-insensitive; `-`, `_` and spaces are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "seednodes" | "static" => Ok(StartupMethod::SeedNodes),
            "configdiscovery" | "config" => Ok(StartupMethod::ConfigDiscovery),
            "kubernetesdiscovery" | "kubernetes" | "platformdiscovery" => {
                Ok(StartupMethod::KubernetesDiscovery)
            }
            _ => Err(ConfigError::UnknownStartupMethod(s.to_string())),
        }
    }
}

impl fmt::Display for StartupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct DiscoveryOptions {
    /// Service name to discover. Also the pod namespace for platform discovery.
    #[arg(long = "discovery-service-name", env = "CLUSTER__DISCOVERY__SERVICENAME")]
    pub service_name: Option<String>,

    /// Name of the management port on discovered contact points.
    #[arg(long = "discovery-port-name", env = "CLUSTER__DISCOVERY__PORTNAME")]
    pub port_name: Option<String>,

    #[arg(
        long = "discovery-management-port",
        env = "CLUSTER__DISCOVERY__MANAGEMENTPORT",
        default_value_t = 8558
    )]
    pub management_port: u16,

    /// Contact point endpoints for configuration discovery, comma separated.
    #[arg(
        long = "discovery-config-endpoints",
        env = "CLUSTER__DISCOVERY__CONFIGENDPOINTS",
        value_delimiter = ','
    )]
    pub config_endpoints: Option<Vec<String>>,

    /// Pod label selector for platform discovery. `{0}` is replaced by the service name.
    #[arg(
        long = "discovery-label-selector",
        env = "CLUSTER__DISCOVERY__LABELSELECTOR",
        default_value = "cluster={0}"
    )]
    pub label_selector: String,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            service_name: None,
            port_name: None,
            management_port: 8558,
            config_endpoints: None,
            label_selector: "cluster={0}".to_string(),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ClusterOptions {
    /// Advertised host name or address.
    #[arg(long = "cluster-ip", env = "CLUSTER__IP")]
    pub ip: Option<String>,

    /// Remoting port.
    #[arg(long = "cluster-port", env = "CLUSTER__PORT")]
    pub port: Option<u16>,

    /// Explicit seed nodes, comma separated.
    #[arg(long = "cluster-seeds", env = "CLUSTER__SEEDS", value_delimiter = ',')]
    pub seeds: Option<Vec<String>>,

    /// SeedNodes, ConfigDiscovery or KubernetesDiscovery.
    #[arg(
        long = "cluster-startup-method",
        env = "CLUSTER__STARTUPMETHOD",
        default_value = "SeedNodes"
    )]
    pub startup_method: String,

    #[command(flatten)]
    pub discovery: DiscoveryOptions,

    /// TCP readiness check port, used with discovery strategies.
    #[arg(long = "cluster-readiness-port", env = "CLUSTER__READINESSPORT", default_value_t = 11001)]
    pub readiness_port: u16,

    /// Diagnostics command port.
    #[arg(long = "cluster-pbm-port", env = "CLUSTER__PBMPORT", default_value_t = 9110)]
    pub pbm_port: u16,

    /// Set when running inside a container runtime.
    #[arg(long = "cluster-is-docker", env = "CLUSTER__ISDOCKER")]
    pub is_docker: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            ip: None,
            port: None,
            seeds: None,
            startup_method: "SeedNodes".to_string(),
            discovery: DiscoveryOptions::default(),
            readiness_port: 11001,
            pbm_port: 9110,
            is_docker: false,
        }
    }
}

/// Tuning for the in-process actors.
#[derive(Debug, Clone, clap::Args)]
pub struct RuntimeOptions {
    /// Simulated CPU load per customer, in percent. 0 disables it.
    #[arg(long, env = "CUSTOMER_CPU_LOAD_PERCENT", default_value_t = 10)]
    pub cpu_load_percent: u8,

    /// Seconds of inactivity before a customer is passivated.
    #[arg(long, env = "PASSIVATE_IDLE_SECS", default_value_t = 60)]
    pub passivate_idle_secs: u64,

    /// Seconds before the first burst.
    #[arg(long, env = "BURST_INITIAL_DELAY_SECS", default_value_t = 30)]
    pub burst_initial_delay_secs: u64,

    /// Seconds between bursts.
    #[arg(long, env = "BURST_INTERVAL_SECS", default_value_t = 300)]
    pub burst_interval_secs: u64,

    /// Number of shards customers are spread over.
    #[arg(long, env = "MAX_SHARDS", default_value_t = DEFAULT_MAX_SHARDS)]
    pub max_shards: u32,

    /// Unconfirmed envelopes allowed per producer.
    #[arg(long, env = "PRODUCER_WINDOW", default_value_t = 16)]
    pub producer_window: usize,
}

impl RuntimeOptions {
    pub fn system_settings(&self) -> SystemSettings {
        let region = RegionSettings {
            passivate_idle_after: Duration::from_secs(self.passivate_idle_secs),
            ..RegionSettings::default()
        };
        SystemSettings {
            region,
            customer: CustomerSettings {
                cpu_load_percent: self.cpu_load_percent,
            },
            producer: ProducerSettings {
                burst_initial_delay: Duration::from_secs(self.burst_initial_delay_secs),
                burst_interval: Duration::from_secs(self.burst_interval_secs),
                ..ProducerSettings::default()
            },
            max_shards: self.max_shards,
            producer_window: self.producer_window,
        }
    }
}

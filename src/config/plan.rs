//! # Cluster Bootstrap Planning
//!
//! Resolves raw [`ClusterOptions`] into an immutable [`BootstrapPlan`]. Exactly one
//! discovery strategy is active in a plan; when it is not the static seed list, the plan
//! carries no seed nodes.
//!
//! Planning is pure apart from diagnostic logging and host lookups through
//! [`HostEnvironment`]. It opens no sockets.

use crate::config::{ClusterOptions, ConfigError, HostEnvironment, Role, StartupMethod};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub const SYSTEM_NAME: &str = "shopping-cart";
pub const DEFAULT_REMOTE_PORT: u16 = 5213;
pub const ANY_INTERFACE: &str = "0.0.0.0";
pub const MIN_NR_OF_MEMBERS: usize = 4;
pub const DEFAULT_REQUIRED_CONTACT_POINTS: usize = 2;
pub const PLATFORM_REQUIRED_CONTACT_POINTS: usize = 3;
pub const STABLE_MARGIN: Duration = Duration::from_secs(5);

/// Seed list used by the static strategy when none is given.
pub fn default_seed_nodes() -> Vec<String> {
    vec![format!("tcp://{SYSTEM_NAME}@localhost:{DEFAULT_REMOTE_PORT}")]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemotePlan {
    /// Address the transport binds to.
    pub bind_host: String,
    pub port: u16,
    /// Address other nodes use to reach this one.
    pub public_host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method")]
pub enum Discovery {
    /// Static seed nodes; no discovery system runs.
    Static,
    Config {
        service_name: Option<String>,
        endpoints: Vec<String>,
    },
    Kubernetes {
        pod_namespace: Option<String>,
        label_selector: String,
    },
}

impl Discovery {
    pub fn is_active(&self) -> bool {
        !matches!(self, Discovery::Static)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterPlan {
    pub min_nr_of_members: usize,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactPointPlan {
    pub service_name: Option<String>,
    pub port_name: Option<String>,
    pub required_contact_points: usize,
    pub stable_margin: Duration,
    pub contact_with_all_contact_points: bool,
}

/// The resolved cluster formation configuration for one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapPlan {
    pub role: Role,
    pub system_name: String,
    pub startup_method: StartupMethod,
    pub remote: RemotePlan,
    /// `None` whenever a discovery strategy is active.
    pub seed_nodes: Option<Vec<String>>,
    pub discovery: Discovery,
    pub cluster: ClusterPlan,
    pub contact_points: ContactPointPlan,
    /// Management endpoint, present only with a discovery strategy.
    pub management: Option<Endpoint>,
    /// TCP readiness port, present only with a discovery strategy.
    pub readiness_port: Option<u16>,
    /// Diagnostics command endpoint.
    pub cmd: Endpoint,
}

impl BootstrapPlan {
    /// `public_host:port`, the address peers use for this node.
    pub fn advertised_address(&self) -> String {
        format!("{}:{}", self.remote.public_host, self.remote.port)
    }
}

/// Resolves `options` into a [`BootstrapPlan`] for `role`.
///
/// # Errors
/// - [`ConfigError::UnknownStartupMethod`] for an unrecognized strategy name.
/// - [`ConfigError::MissingDiscoveryEndpoints`] for configuration discovery without
///   endpoints, whatever seeds were supplied.
/// - [`ConfigError::HostResolution`] when platform discovery cannot resolve the host
///   address. A host name that cannot be read falls back to `localhost`.
pub fn plan(
    role: Role,
    options: &ClusterOptions,
    host: &dyn HostEnvironment,
) -> Result<BootstrapPlan, ConfigError> {
    let startup_method: StartupMethod = options.startup_method.parse()?;
    let discovery_options = &options.discovery;

    let port = match options.port {
        Some(port) => {
            info!(port, "From environment: PORT");
            port
        }
        None => {
            info!(port = DEFAULT_REMOTE_PORT, "From environment: PORT not set, using default");
            DEFAULT_REMOTE_PORT
        }
    };
    let explicit_ip = options
        .ip
        .as_deref()
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let mut remote = RemotePlan {
        bind_host: ANY_INTERFACE.to_string(),
        port,
        public_host: resolve_public_host(explicit_ip, options.is_docker, host),
    };
    let mut required_contact_points = DEFAULT_REQUIRED_CONTACT_POINTS;

    let (seed_nodes, discovery) = match startup_method {
        StartupMethod::SeedNodes => {
            let seeds = match &options.seeds {
                Some(seeds) => {
                    info!(seeds = ?seeds, "From environment: SEEDS");
                    seeds.clone()
                }
                None => {
                    let seeds = default_seed_nodes();
                    info!(seeds = ?seeds, "From environment: SEEDS not set, using default");
                    seeds
                }
            };
            info!("Forming cluster using seed nodes");
            (Some(seeds), Discovery::Static)
        }
        StartupMethod::ConfigDiscovery => {
            info!("Forming cluster using configuration discovery");
            let endpoints = discovery_options
                .config_endpoints
                .clone()
                .ok_or(ConfigError::MissingDiscoveryEndpoints)?;
            info!(endpoints = ?endpoints, "From environment: discovery endpoints");
            let discovery = Discovery::Config {
                service_name: discovery_options.service_name.clone(),
                endpoints,
            };
            (None, discovery)
        }
        StartupMethod::KubernetesDiscovery => {
            info!("Forming cluster using platform discovery");
            let address = host.host_address()?.to_string();
            remote.bind_host = address.clone();
            remote.public_host = address;
            required_contact_points = PLATFORM_REQUIRED_CONTACT_POINTS;
            let service_name = discovery_options.service_name.clone();
            let label_selector = discovery_options
                .label_selector
                .replace("{0}", service_name.as_deref().unwrap_or_default());
            let discovery = Discovery::Kubernetes {
                pod_namespace: service_name,
                label_selector,
            };
            (None, discovery)
        }
    };

    let management = match &discovery {
        Discovery::Static => None,
        Discovery::Config { .. } => {
            let host_name = match explicit_ip {
                Some(ip) => ip.to_string(),
                None => host_name_or_localhost(host),
            };
            Some(Endpoint::new(host_name, discovery_options.management_port))
        }
        Discovery::Kubernetes { .. } => Some(Endpoint::new("", discovery_options.management_port)),
    };
    let readiness_port = discovery.is_active().then_some(options.readiness_port);

    let plan = BootstrapPlan {
        role,
        system_name: SYSTEM_NAME.to_string(),
        startup_method,
        remote,
        seed_nodes,
        discovery,
        cluster: ClusterPlan {
            min_nr_of_members: MIN_NR_OF_MEMBERS,
            roles: vec![role],
        },
        contact_points: ContactPointPlan {
            service_name: discovery_options.service_name.clone(),
            port_name: discovery_options.port_name.clone(),
            required_contact_points,
            stable_margin: STABLE_MARGIN,
            contact_with_all_contact_points: true,
        },
        management,
        readiness_port,
        cmd: Endpoint::new(ANY_INTERFACE, options.pbm_port),
    };
    info!(
        %role,
        %startup_method,
        address = %plan.advertised_address(),
        "Bootstrap plan resolved"
    );
    Ok(plan)
}

fn resolve_public_host(
    explicit_ip: Option<&str>,
    is_docker: bool,
    host: &dyn HostEnvironment,
) -> String {
    if let Some(ip) = explicit_ip {
        info!(ip, "From environment: IP");
        return ip.to_string();
    }
    if is_docker {
        let name = host_name_or_localhost(host);
        info!(host = %name, "From environment: IP not set, running in a container");
        return name;
    }
    info!("From environment: IP not set, not in a container, using localhost");
    "localhost".to_string()
}

fn host_name_or_localhost(host: &dyn HostEnvironment) -> String {
    host.host_name().unwrap_or_else(|e| {
        warn!(error = %e, "Host name unavailable, using localhost");
        "localhost".to_string()
    })
}

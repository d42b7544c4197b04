//! Access to the local host's name and network address.

use crate::config::ConfigError;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

/// What the planner needs to know about the machine it runs on.
pub trait HostEnvironment {
    fn host_name(&self) -> Result<String, ConfigError>;

    /// The first IPv4 address the host name resolves to.
    fn host_address(&self) -> Result<Ipv4Addr, ConfigError>;
}

/// Reads the real host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostEnvironment for SystemHost {
    fn host_name(&self) -> Result<String, ConfigError> {
        if let Ok(name) = std::env::var("HOSTNAME") {
            if !name.trim().is_empty() {
                return Ok(name.trim().to_string());
            }
        }
        let name = std::fs::read_to_string("/etc/hostname")
            .map_err(|e| ConfigError::HostResolution(format!("reading /etc/hostname: {e}")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::HostResolution("empty host name".to_string()));
        }
        Ok(name.to_string())
    }

    fn host_address(&self) -> Result<Ipv4Addr, ConfigError> {
        let name = self.host_name()?;
        let addrs = (name.as_str(), 0)
            .to_socket_addrs()
            .map_err(|e| ConfigError::HostResolution(format!("{name}: {e}")))?;
        addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| ConfigError::HostResolution(format!("{name}: no IPv4 address")))
    }
}

/// A host with a fixed name and address.
#[derive(Debug, Clone)]
pub struct FixedHost {
    pub name: String,
    pub address: Ipv4Addr,
}

impl FixedHost {
    pub fn new(name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

impl HostEnvironment for FixedHost {
    fn host_name(&self) -> Result<String, ConfigError> {
        Ok(self.name.clone())
    }

    fn host_address(&self) -> Result<Ipv4Addr, ConfigError> {
        Ok(self.address)
    }
}

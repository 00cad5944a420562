use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use super::connector::ConnectorConfig;
use super::errors::ConfigError;
use super::identity::IdentityConfig;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::upstream::UpstreamConfig;
use crate::address_plan::{plan_addresses, AddressPlan};
use crate::destination_filter::DestinationFilter;

/// Main configuration structure for the connector
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener configuration (port, bind address)
    #[serde(default)]
    pub server: ServerConfig,

    /// Site identity, serviced prefixes and ignored destinations
    #[serde(default)]
    pub connector: ConnectorConfig,

    /// Resolvers used to look up real destinations
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Peer attribution
    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. natc.toml in current directory
    /// 3. /etc/natc/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("natc.toml").exists() {
            Self::from_file("natc.toml")?
        } else if std::path::Path::new("/etc/natc/config.toml").exists() {
            Self::from_file("/etc/natc/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = Some(bind);
        }
        if let Some(site_id) = overrides.site_id {
            self.connector.site_id = site_id;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.dns_port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }

        self.address_plan()?;
        self.destination_filter()?;

        if self.upstream.servers.is_empty() {
            return Err(ConfigError::Validation(
                "No upstream servers configured".to_string(),
            ));
        }
        self.upstream_servers()?;

        for peer in &self.identity.peers {
            peer.address.parse::<IpAddr>().map_err(|e| {
                ConfigError::Validation(format!("Invalid peer address '{}': {}", peer.address, e))
            })?;
            if peer.id.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Peer {} has an empty id",
                    peer.address
                )));
            }
        }

        Ok(())
    }

    pub fn v4_prefixes(&self) -> Result<Vec<Ipv4Network>, ConfigError> {
        self.connector
            .v4_prefixes
            .iter()
            .map(|p| {
                p.parse::<Ipv4Network>()
                    .map_err(|e| ConfigError::Validation(format!("Invalid prefix '{}': {}", p, e)))
            })
            .collect()
    }

    pub fn address_plan(&self) -> Result<AddressPlan, ConfigError> {
        plan_addresses(&self.v4_prefixes()?).map_err(|e| ConfigError::Validation(e.to_string()))
    }

    pub fn destination_filter(&self) -> Result<DestinationFilter, ConfigError> {
        DestinationFilter::from_cidrs(&self.connector.ignore_destinations)
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    pub fn upstream_servers(&self) -> Result<Vec<SocketAddr>, ConfigError> {
        self.upstream
            .servers
            .iter()
            .map(|s| {
                s.parse::<SocketAddr>().map_err(|e| {
                    ConfigError::Validation(format!("Invalid upstream server '{}': {}", s, e))
                })
            })
            .collect()
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub bind_address: Option<String>,
    pub site_id: Option<u16>,
    pub log_level: Option<String>,
}

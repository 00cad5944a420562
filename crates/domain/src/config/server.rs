use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_dns_port")]
    pub dns_port: u16,

    /// Listen address. When unset the listener binds the planned DNS address.
    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dns_port: default_dns_port(),
            bind_address: None,
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

fn default_dns_port() -> u16 {
    53
}

fn default_write_timeout_ms() -> u64 {
    1000
}

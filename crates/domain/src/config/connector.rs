use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectorConfig {
    /// Must be unique among connectors sharing an address space.
    #[serde(default)]
    pub site_id: u16,

    /// Serviced IPv4 prefixes. The first host of the first prefix is the DNS address.
    #[serde(default = "default_v4_prefixes")]
    pub v4_prefixes: Vec<String>,

    /// Destinations that are answered with their real addresses.
    #[serde(default)]
    pub ignore_destinations: Vec<String>,

    /// Idle time after which an IPv4 allocation may be reclaimed under pool pressure.
    #[serde(default = "default_reclaim_idle_secs")]
    pub reclaim_idle_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            site_id: 0,
            v4_prefixes: default_v4_prefixes(),
            ignore_destinations: Vec::new(),
            reclaim_idle_secs: default_reclaim_idle_secs(),
        }
    }
}

fn default_v4_prefixes() -> Vec<String> {
    vec!["100.64.1.0/24".to_string()]
}

fn default_reclaim_idle_secs() -> u64 {
    3600
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    #[serde(default = "default_whois_timeout_ms")]
    pub whois_timeout_ms: u64,

    /// Static peer directory used when no external identity service is wired in.
    #[serde(default)]
    pub peers: Vec<PeerEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PeerEntry {
    /// Tailnet address the peer sends queries from.
    pub address: String,

    pub id: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            whois_timeout_ms: default_whois_timeout_ms(),
            peers: Vec::new(),
        }
    }
}

fn default_whois_timeout_ms() -> u64 {
    1000
}

use async_trait::async_trait;
use natc_application::ports::PeerIdentityPort;
use natc_domain::config::PeerEntry;
use natc_domain::{DomainError, PeerId};
use rustc_hash::FxHashMap;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

/// Peer directory loaded from `[[identity.peers]]`, keyed by source IP.
///
/// The source port is ignored: a peer may query from any port. IPv4-mapped
/// IPv6 sources from a dual-stack socket match their IPv4 entry.
pub struct StaticPeerDirectory {
    peers: FxHashMap<IpAddr, PeerId>,
}

impl StaticPeerDirectory {
    pub fn from_entries(entries: &[PeerEntry]) -> Result<Self, DomainError> {
        let mut peers = FxHashMap::default();
        for entry in entries {
            let addr: IpAddr = entry.address.parse().map_err(|e| {
                DomainError::InvalidIpAddress(format!("{}: {}", entry.address, e))
            })?;
            peers.insert(addr.to_canonical(), PeerId::new(entry.id.as_str()));
        }
        debug!(peers = peers.len(), "Static peer directory loaded");
        Ok(Self { peers })
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[async_trait]
impl PeerIdentityPort for StaticPeerDirectory {
    async fn who_is(&self, src: SocketAddr) -> Result<PeerId, DomainError> {
        let ip = src.ip().to_canonical();
        self.peers
            .get(&ip)
            .cloned()
            .ok_or_else(|| DomainError::PeerNotFound(ip.to_string()))
    }
}

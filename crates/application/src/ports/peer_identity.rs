use async_trait::async_trait;
use natc_domain::{DomainError, PeerId};
use std::net::SocketAddr;

#[async_trait]
pub trait PeerIdentityPort: Send + Sync {
    /// Identify the peer that sent a datagram from `src`.
    async fn who_is(&self, src: SocketAddr) -> Result<PeerId, DomainError>;
}

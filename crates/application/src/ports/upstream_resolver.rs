use async_trait::async_trait;
use natc_domain::DomainError;
use std::net::IpAddr;

/// Address families requested from the upstream resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupNetwork {
    Ip,
    Ip4,
    Ip6,
}

#[async_trait]
pub trait UpstreamResolver: Send + Sync {
    /// Resolve the real addresses of `host`.
    ///
    /// Errors are classified with [`DomainError::is_not_found`],
    /// [`DomainError::is_timeout`] and [`DomainError::is_temporary`].
    async fn lookup_ip(
        &self,
        network: LookupNetwork,
        host: &str,
    ) -> Result<Vec<IpAddr>, DomainError>;
}

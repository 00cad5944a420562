pub mod udp;

use async_trait::async_trait;
use natc_domain::DomainError;
use std::time::Duration;

pub use udp::UdpTransport;

#[derive(Debug)]
pub struct TransportResponse {
    pub bytes: Vec<u8>,
}

/// Sends one encoded query to one upstream server.
///
/// A deadline miss is reported as [`DomainError::QueryTimeout`]; socket
/// failures as [`DomainError::TemporaryFailure`].
#[async_trait]
pub trait DnsTransport: Send + Sync {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError>;

    fn protocol_name(&self) -> &'static str;
}

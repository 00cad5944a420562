//! UDP transport to upstream resolvers (RFC 1035 §4.2.1).
//!
//! One ephemeral socket per query, connected to the server so the kernel
//! discards datagrams from anyone else.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use natc_domain::DomainError;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

const MAX_UDP_RESPONSE_SIZE: usize = 4096;

pub struct UdpTransport {
    server_addr: SocketAddr,
}

impl UdpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    fn bind_addr(&self) -> SocketAddr {
        if self.server_addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        }
    }

    fn io_error(&self, action: &str, e: std::io::Error) -> DomainError {
        DomainError::TemporaryFailure(format!("{} {}: {}", action, self.server_addr, e))
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        let exchange = async {
            let socket = UdpSocket::bind(self.bind_addr())
                .await
                .map_err(|e| self.io_error("bind for", e))?;
            socket
                .connect(self.server_addr)
                .await
                .map_err(|e| self.io_error("connect to", e))?;

            let bytes_sent = socket
                .send(message_bytes)
                .await
                .map_err(|e| self.io_error("send to", e))?;
            debug!(server = %self.server_addr, bytes_sent, "UDP query sent");

            let mut recv_buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
            let bytes_received = socket
                .recv(&mut recv_buf)
                .await
                .map_err(|e| self.io_error("receive from", e))?;
            recv_buf.truncate(bytes_received);

            debug!(server = %self.server_addr, bytes_received, "UDP response received");
            Ok::<_, DomainError>(recv_buf)
        };

        let bytes = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| DomainError::QueryTimeout)??;

        Ok(TransportResponse { bytes })
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}

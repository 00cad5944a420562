use super::RecordType;
use std::net::SocketAddr;
use std::sync::Arc;

/// The first question of an inbound query, with the datagram's source.
#[derive(Debug, Clone)]
pub struct DnsRequest {
    pub domain: Arc<str>,
    pub record_type: RecordType,
    pub client_addr: SocketAddr,
}

impl DnsRequest {
    pub fn new(
        domain: impl Into<Arc<str>>,
        record_type: RecordType,
        client_addr: SocketAddr,
    ) -> Self {
        Self {
            domain: domain.into(),
            record_type,
            client_addr,
        }
    }
}

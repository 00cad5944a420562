use super::message_builder::MessageBuilder;
use super::response_parser::ResponseParser;
use crate::dns::transport::{DnsTransport, UdpTransport};
use async_trait::async_trait;
use natc_application::ports::{LookupNetwork, UpstreamResolver};
use natc_domain::{DomainError, RecordType};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Resolves real addresses by forwarding A/AAAA queries to upstream servers.
///
/// Servers are tried in order. The first definitive answer (NOERROR or
/// NXDOMAIN) wins; timeouts and server failures move on to the next one.
pub struct ForwardingResolver {
    transports: Vec<Arc<dyn DnsTransport>>,
    timeout: Duration,
}

impl ForwardingResolver {
    pub fn new(servers: &[SocketAddr], timeout: Duration) -> Self {
        let transports = servers
            .iter()
            .map(|addr| Arc::new(UdpTransport::new(*addr)) as Arc<dyn DnsTransport>)
            .collect();
        Self::with_transports(transports, timeout)
    }

    pub fn with_transports(transports: Vec<Arc<dyn DnsTransport>>, timeout: Duration) -> Self {
        Self {
            transports,
            timeout,
        }
    }

    async fn query_type(
        &self,
        host: &str,
        record_type: RecordType,
    ) -> Result<Vec<IpAddr>, DomainError> {
        let mut last_error = DomainError::TemporaryFailure("no upstream servers".to_string());

        for (index, transport) in self.transports.iter().enumerate() {
            match self.exchange(transport.as_ref(), host, record_type).await {
                Ok(addrs) => return Ok(addrs),
                Err(e) if e.is_not_found() => return Err(e),
                Err(e) => {
                    debug!(
                        server = index,
                        protocol = transport.protocol_name(),
                        host = %host,
                        record_type = %record_type,
                        error = %e,
                        "Upstream attempt failed"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn exchange(
        &self,
        transport: &dyn DnsTransport,
        host: &str,
        record_type: RecordType,
    ) -> Result<Vec<IpAddr>, DomainError> {
        let (id, query) = MessageBuilder::build_query(host, &record_type)?;
        let raw = transport.send(&query, self.timeout).await?;
        let response = ResponseParser::parse(&raw.bytes)?;

        if response.id != id {
            return Err(DomainError::TemporaryFailure(format!(
                "response ID {} does not match query ID {}",
                response.id, id
            )));
        }
        ResponseParser::classify(&response)?;

        Ok(response
            .addresses
            .into_iter()
            .filter(|addr| match record_type {
                RecordType::A => addr.is_ipv4(),
                _ => addr.is_ipv6(),
            })
            .collect())
    }
}

#[async_trait]
impl UpstreamResolver for ForwardingResolver {
    #[instrument(skip(self))]
    async fn lookup_ip(
        &self,
        network: LookupNetwork,
        host: &str,
    ) -> Result<Vec<IpAddr>, DomainError> {
        let results = match network {
            LookupNetwork::Ip4 => vec![self.query_type(host, RecordType::A).await],
            LookupNetwork::Ip6 => vec![self.query_type(host, RecordType::AAAA).await],
            LookupNetwork::Ip => {
                let (v4, v6) = tokio::join!(
                    self.query_type(host, RecordType::A),
                    self.query_type(host, RecordType::AAAA)
                );
                vec![v4, v6]
            }
        };

        let mut addrs = Vec::new();
        let mut failure = None;
        for result in results {
            match result {
                Ok(found) => addrs.extend(found),
                Err(e) if e.is_not_found() => {}
                Err(e) => failure = Some(e),
            }
        }

        if !addrs.is_empty() {
            return Ok(addrs);
        }
        match failure {
            Some(e) => {
                warn!(host = %host, error = %e, "Upstream lookup failed");
                Err(e)
            }
            // Every family came back empty or NXDOMAIN.
            None => Err(DomainError::NxDomain),
        }
    }
}

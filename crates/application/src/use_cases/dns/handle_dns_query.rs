use crate::ports::{LookupNetwork, PeerIdentityPort, UpstreamResolver};
use crate::services::IpPool;
use natc_domain::{
    normalize_fqdn, AddressFamily, DestinationFilter, DnsRequest, DomainError, PeerId, RecordType,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_WHOIS_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// What the connector answers for one question. Any `Err` from
/// [`HandleDnsQueryUseCase::execute`] means no response is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// NOERROR with these answers, in order.
    Answer(Vec<IpAddr>),
    /// NOERROR without answers.
    NoData,
    NxDomain,
}

pub struct HandleDnsQueryUseCase {
    identity: Arc<dyn PeerIdentityPort>,
    resolver: Arc<dyn UpstreamResolver>,
    ip_pool: Arc<IpPool>,
    ignore_dsts: Arc<DestinationFilter>,
    whois_timeout: Duration,
    lookup_timeout: Duration,
}

impl HandleDnsQueryUseCase {
    pub fn new(
        identity: Arc<dyn PeerIdentityPort>,
        resolver: Arc<dyn UpstreamResolver>,
        ip_pool: Arc<IpPool>,
    ) -> Self {
        Self {
            identity,
            resolver,
            ip_pool,
            ignore_dsts: Arc::new(DestinationFilter::new()),
            whois_timeout: DEFAULT_WHOIS_TIMEOUT,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_destination_filter(mut self, filter: Arc<DestinationFilter>) -> Self {
        self.ignore_dsts = filter;
        self
    }

    pub fn with_timeouts(mut self, whois: Duration, lookup: Duration) -> Self {
        self.whois_timeout = whois;
        self.lookup_timeout = lookup;
        self
    }

    pub fn ip_pool(&self) -> &Arc<IpPool> {
        &self.ip_pool
    }

    pub async fn execute(&self, request: &DnsRequest) -> Result<QueryOutcome, DomainError> {
        let peer = self.identify(request).await?;

        let family = match request.record_type {
            RecordType::A => AddressFamily::V4,
            RecordType::AAAA => AddressFamily::V6,
            other => {
                debug!(domain = %request.domain, record_type = %other, "Answering without records");
                return Ok(QueryOutcome::NoData);
            }
        };

        let fqdn = normalize_fqdn(&request.domain)?;
        let resolved = match self.lookup(&fqdn).await {
            Ok(addrs) => addrs,
            Err(e) if e.is_not_found() => {
                debug!(domain = %fqdn, "Upstream reports NXDOMAIN");
                return Ok(QueryOutcome::NxDomain);
            }
            Err(e) => return Err(e),
        };

        if !resolved.iter().any(|addr| family.matches(addr)) {
            debug!(domain = %fqdn, record_type = %request.record_type, "No upstream address of requested family");
            return Ok(QueryOutcome::NoData);
        }

        if self.ignore_dsts.is_ignored(&resolved) {
            debug!(domain = %fqdn, "Destination ignored, passing real addresses through");
            let real: Vec<IpAddr> = resolved.into_iter().filter(|a| family.matches(a)).collect();
            return Ok(QueryOutcome::Answer(real));
        }

        let synthetic = self
            .ip_pool
            .ip_for_domain_family(&peer, &fqdn, family)?
            .into_iter()
            .find(|addr| family.matches(addr));

        match synthetic {
            Some(addr) => {
                debug!(domain = %fqdn, peer = %peer, addr = %addr, "Synthetic answer");
                Ok(QueryOutcome::Answer(vec![addr]))
            }
            None => Ok(QueryOutcome::NoData),
        }
    }

    async fn identify(&self, request: &DnsRequest) -> Result<PeerId, DomainError> {
        match tokio::time::timeout(self.whois_timeout, self.identity.who_is(request.client_addr))
            .await
        {
            Ok(Ok(peer)) => Ok(peer),
            Ok(Err(e)) => {
                debug!(client = %request.client_addr, error = %e, "Peer lookup failed");
                Err(DomainError::PeerNotFound(request.client_addr.to_string()))
            }
            Err(_) => {
                debug!(client = %request.client_addr, "Peer lookup timed out");
                Err(DomainError::PeerNotFound(request.client_addr.to_string()))
            }
        }
    }

    async fn lookup(&self, fqdn: &str) -> Result<Vec<IpAddr>, DomainError> {
        tokio::time::timeout(
            self.lookup_timeout,
            self.resolver.lookup_ip(LookupNetwork::Ip, fqdn),
        )
        .await
        .map_err(|_| DomainError::QueryTimeout)?
    }
}

use crate::dns::forwarding::RecordTypeMapper;
use crate::dns::wire::{build_response, parse_query};
use hickory_proto::op::ResponseCode;
use natc_application::use_cases::{HandleDnsQueryUseCase, QueryOutcome};
use natc_domain::{DnsRequest, DomainError};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Turns one inbound datagram into at most one response datagram.
#[derive(Clone)]
pub struct DnsServerHandler {
    use_case: Arc<HandleDnsQueryUseCase>,
}

impl DnsServerHandler {
    pub fn new(use_case: Arc<HandleDnsQueryUseCase>) -> Self {
        Self { use_case }
    }

    /// Returns `None` whenever the query must go unanswered: malformed
    /// input, no question, unknown peer, transient upstream failure or an
    /// exhausted IPv4 pool.
    #[instrument(skip(self, buf), fields(client = %src, len = buf.len()))]
    pub async fn handle_datagram(&self, buf: &[u8], src: SocketAddr) -> Option<Vec<u8>> {
        let query = match parse_query(buf) {
            Ok(query) => query,
            Err(e) => {
                debug!(error = %e, "Dropping unparseable datagram");
                return None;
            }
        };

        let Some(question) = query.question.as_ref() else {
            debug!(id = query.id, "Dropping query without questions");
            return None;
        };

        let record_type = RecordTypeMapper::from_hickory(question.query.query_type());
        debug!(domain = %question.domain, record_type = %record_type, "DNS query received");

        let request = DnsRequest::new(question.domain.as_str(), record_type, src);

        let (rcode, answers) = match self.use_case.execute(&request).await {
            Ok(QueryOutcome::Answer(addrs)) => (ResponseCode::NoError, addrs),
            Ok(QueryOutcome::NoData) => (ResponseCode::NoError, Vec::new()),
            Ok(QueryOutcome::NxDomain) => (ResponseCode::NXDomain, Vec::new()),
            Err(e) => {
                log_drop(&question.domain, &e);
                return None;
            }
        };

        debug!(
            domain = %question.domain,
            rcode = ?rcode,
            answers = answers.len(),
            "Sending response"
        );
        match build_response(&query, question, rcode, &answers) {
            Ok(response) => Some(response),
            Err(e) => {
                debug!(domain = %question.domain, error = %e, "Dropping unencodable response");
                None
            }
        }
    }
}

fn log_drop(domain: &str, error: &DomainError) {
    match error {
        DomainError::PoolExhausted(_) => {
            warn!(domain = %domain, error = %error, "Dropping query, address pool exhausted")
        }
        DomainError::QueryTimeout | DomainError::TemporaryFailure(_) | DomainError::IoError(_) => {
            warn!(domain = %domain, error = %error, "Dropping query, upstream lookup failed")
        }
        _ => debug!(domain = %domain, error = %error, "Dropping query"),
    }
}

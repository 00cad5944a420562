use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RData;
use natc_domain::DomainError;
use std::net::IpAddr;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DnsResponse {
    pub id: u16,

    pub addresses: Vec<IpAddr>,

    pub rcode: ResponseCode,
}

pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(response_bytes: &[u8]) -> Result<DnsResponse, DomainError> {
        let message = Message::from_vec(response_bytes).map_err(|e| {
            DomainError::MalformedMessage(format!("Failed to parse DNS response: {}", e))
        })?;

        let rcode = message.response_code();

        let addresses: Vec<IpAddr> = message
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                RData::A(a) => Some(IpAddr::V4(a.0)),
                RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
                _ => None,
            })
            .collect();

        debug!(
            rcode = ?rcode,
            addresses = addresses.len(),
            "DNS response parsed"
        );

        Ok(DnsResponse {
            id: message.id(),
            addresses,
            rcode,
        })
    }

    /// Maps a non-success rcode onto the lookup error taxonomy.
    pub fn classify(response: &DnsResponse) -> Result<(), DomainError> {
        match response.rcode {
            ResponseCode::NoError => Ok(()),
            ResponseCode::NXDomain => Err(DomainError::NxDomain),
            other => Err(DomainError::TemporaryFailure(format!(
                "upstream answered {}",
                Self::rcode_to_status(other)
            ))),
        }
    }

    pub fn rcode_to_status(rcode: ResponseCode) -> &'static str {
        match rcode {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::NXDomain => "NXDOMAIN",
            ResponseCode::ServFail => "SERVFAIL",
            ResponseCode::Refused => "REFUSED",
            ResponseCode::NotImp => "NOTIMP",
            ResponseCode::FormErr => "FORMERR",
            _ => "UNKNOWN",
        }
    }
}

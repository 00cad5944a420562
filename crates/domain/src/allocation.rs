use crate::{DomainError, PeerId};
use std::net::IpAddr;
use std::sync::Arc;

const MAX_FQDN_LEN: usize = 254;

/// Lower-cases `domain` and enforces exactly one trailing dot.
///
/// `"Example.COM"` and `"example.com."` both become `"example.com."`.
pub fn normalize_fqdn(domain: &str) -> Result<Arc<str>, DomainError> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(DomainError::InvalidDomainName(
            "domain cannot be empty".to_string(),
        ));
    }
    if trimmed.len() + 1 > MAX_FQDN_LEN {
        return Err(DomainError::InvalidDomainName(format!(
            "domain too long ({} bytes)",
            trimmed.len()
        )));
    }
    if trimmed.split('.').any(|label| label.is_empty() || label.len() > 63) {
        return Err(DomainError::InvalidDomainName(format!(
            "invalid label in {}",
            trimmed
        )));
    }

    let mut fqdn = trimmed.to_ascii_lowercase();
    fqdn.push('.');
    Ok(Arc::from(fqdn))
}

/// Key of one allocation: a peer and a normalized FQDN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllocationKey {
    pub peer: PeerId,
    pub domain: Arc<str>,
}

impl AllocationKey {
    pub fn new(peer: PeerId, domain: &str) -> Result<Self, DomainError> {
        Ok(Self {
            peer,
            domain: normalize_fqdn(domain)?,
        })
    }
}

/// Which address families a caller needs from an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
    Both,
}

impl AddressFamily {
    pub fn needs_v4(self) -> bool {
        matches!(self, AddressFamily::V4 | AddressFamily::Both)
    }

    pub fn matches(self, addr: &IpAddr) -> bool {
        match self {
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
            AddressFamily::Both => true,
        }
    }
}

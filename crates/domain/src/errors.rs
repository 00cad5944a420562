use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR format: {0}")]
    InvalidCidr(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Malformed DNS message: {0}")]
    MalformedMessage(String),

    #[error("Peer not found for {0}")]
    PeerNotFound(String),

    #[error("Address pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("Domain not found (NXDOMAIN)")]
    NxDomain,

    #[error("Query timeout")]
    QueryTimeout,

    #[error("Temporary failure: {0}")]
    TemporaryFailure(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl DomainError {
    /// Upstream lookup reported that the name does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NxDomain)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DomainError::QueryTimeout)
    }

    /// Every failure other than not-found is temporary, timeouts included.
    pub fn is_temporary(&self) -> bool {
        !self.is_not_found()
    }
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::IoError(e.to_string())
    }
}

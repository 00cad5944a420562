#![allow(dead_code)]

use async_trait::async_trait;
use natc_application::ports::{LookupNetwork, PeerIdentityPort, UpstreamResolver};
use natc_domain::{DomainError, PeerId};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Identity directory keyed by source IP, ignoring the port.
#[derive(Clone, Default)]
pub struct MockIdentity {
    peers: Arc<RwLock<HashMap<IpAddr, PeerId>>>,
    delay: Option<Duration>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peer(self, ip: &str, peer: &str) -> Self {
        self.peers
            .write()
            .unwrap()
            .insert(ip.parse().unwrap(), PeerId::from(peer));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PeerIdentityPort for MockIdentity {
    async fn who_is(&self, src: SocketAddr) -> Result<PeerId, DomainError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.peers
            .read()
            .unwrap()
            .get(&src.ip())
            .cloned()
            .ok_or_else(|| DomainError::PeerNotFound(src.to_string()))
    }
}

/// Resolver with canned answers. Unknown names are NXDOMAIN.
#[derive(Clone, Default)]
pub struct MockResolver {
    responses: Arc<RwLock<HashMap<String, Vec<IpAddr>>>>,
    errors: Arc<RwLock<HashMap<String, DomainError>>>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, host: &str, addrs: &[&str]) -> Self {
        self.responses.write().unwrap().insert(
            host.to_string(),
            addrs.iter().map(|a| a.parse().unwrap()).collect(),
        );
        self
    }

    pub fn with_error(self, host: &str, error: DomainError) -> Self {
        self.errors.write().unwrap().insert(host.to_string(), error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamResolver for MockResolver {
    async fn lookup_ip(
        &self,
        _network: LookupNetwork,
        host: &str,
    ) -> Result<Vec<IpAddr>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.errors.read().unwrap().get(host).cloned() {
            return Err(err);
        }
        self.responses
            .read()
            .unwrap()
            .get(host)
            .cloned()
            .ok_or(DomainError::NxDomain)
    }
}

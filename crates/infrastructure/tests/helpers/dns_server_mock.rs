#![allow(dead_code)]
use hickory_proto::op::ResponseCode;
use natc_infrastructure::dns::wire::{build_response, parse_query};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

/// How the mock upstream answers one (name, type) question.
#[derive(Clone, Debug)]
pub enum MockAnswer {
    Addresses(Vec<IpAddr>),
    NxDomain,
    ServFail,
    /// Never reply.
    Silent,
}

/// Upstream DNS server on an ephemeral loopback port.
///
/// Unknown questions get NOERROR with no answers.
pub struct MockDnsServer {
    addr: SocketAddr,
    queries: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    /// `answers` is keyed by lower-case FQDN (trailing dot) and qtype.
    pub async fn start(
        answers: HashMap<(String, u16), MockAnswer>,
    ) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = socket.local_addr()?;
        let queries = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&queries);

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            counter.fetch_add(1, Ordering::SeqCst);
                            if let Some(response) = Self::build_mock_response(&answers, &buf[..len]) {
                                let _ = socket.send_to(&response, peer).await;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            queries,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn build_mock_response(
        answers: &HashMap<(String, u16), MockAnswer>,
        query: &[u8],
    ) -> Option<Vec<u8>> {
        let parsed = parse_query(query).ok()?;
        let question = parsed.question.clone()?;
        let key = (
            question.domain.to_ascii_lowercase(),
            u16::from(question.query.query_type()),
        );

        let (rcode, addrs) = match answers.get(&key) {
            Some(MockAnswer::Addresses(addrs)) => (ResponseCode::NoError, addrs.clone()),
            Some(MockAnswer::NxDomain) => (ResponseCode::NXDomain, Vec::new()),
            Some(MockAnswer::ServFail) => (ResponseCode::ServFail, Vec::new()),
            Some(MockAnswer::Silent) => return None,
            None => (ResponseCode::NoError, Vec::new()),
        };
        let mut response = build_response(&parsed, &question, rcode, &addrs).ok()?;
        // Upstream answers are not authoritative.
        response[2] &= !0x04;
        Some(response)
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Builder-style map for [`MockDnsServer::start`].
#[derive(Default)]
pub struct Answers(HashMap<(String, u16), MockAnswer>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn a(mut self, name: &str, addrs: &[&str]) -> Self {
        self.0.insert((name.to_string(), 1), addresses(addrs));
        self
    }

    pub fn aaaa(mut self, name: &str, addrs: &[&str]) -> Self {
        self.0.insert((name.to_string(), 28), addresses(addrs));
        self
    }

    pub fn both(mut self, name: &str, answer: MockAnswer) -> Self {
        self.0.insert((name.to_string(), 1), answer.clone());
        self.0.insert((name.to_string(), 28), answer);
        self
    }

    pub fn build(self) -> HashMap<(String, u16), MockAnswer> {
        self.0
    }
}

fn addresses(addrs: &[&str]) -> MockAnswer {
    MockAnswer::Addresses(addrs.iter().map(|a| a.parse().unwrap()).collect())
}

mod datagram_socket;
mod peer_identity;
mod upstream_resolver;

pub use datagram_socket::DatagramSocket;
pub use peer_identity::PeerIdentityPort;
pub use upstream_resolver::{LookupNetwork, UpstreamResolver};

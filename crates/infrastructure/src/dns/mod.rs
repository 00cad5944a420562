pub mod forwarding;
pub mod listener;
pub mod server;
pub mod transport;
pub mod wire;

pub use forwarding::ForwardingResolver;
pub use listener::serve;
pub use server::DnsServerHandler;

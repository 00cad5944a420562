pub mod connector;
pub mod errors;
pub mod identity;
pub mod logging;
pub mod root;
pub mod server;
pub mod upstream;

pub use connector::ConnectorConfig;
pub use errors::ConfigError;
pub use identity::{IdentityConfig, PeerEntry};
pub use logging::LoggingConfig;
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use upstream::UpstreamConfig;

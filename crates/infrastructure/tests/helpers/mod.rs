mod dns_server_mock;
mod recording_socket;

pub use dns_server_mock::*;
pub use recording_socket::*;

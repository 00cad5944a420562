//! natc domain layer
pub mod address_plan;
pub mod allocation;
pub mod config;
pub mod destination_filter;
pub mod dns_request;
pub mod errors;
pub mod peer;
pub mod record_type;

pub use address_plan::{plan_addresses, ula, AddressPlan, AddressPool};
pub use allocation::{normalize_fqdn, AddressFamily, AllocationKey};
pub use config::{CliOverrides, Config, ConfigError};
pub use destination_filter::DestinationFilter;
pub use dns_request::DnsRequest;
pub use errors::DomainError;
pub use peer::PeerId;
pub use record_type::RecordType;

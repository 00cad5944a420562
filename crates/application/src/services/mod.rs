pub mod ip_pool;

pub use ip_pool::IpPool;

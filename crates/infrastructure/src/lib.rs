pub mod dns;
pub mod identity;

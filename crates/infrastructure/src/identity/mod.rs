pub mod static_directory;

pub use static_directory::StaticPeerDirectory;

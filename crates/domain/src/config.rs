pub mod cache;
pub mod dnssec;
pub mod errors;
pub mod resolver;
pub mod upstream;

pub use cache::CacheConfig;
pub use dnssec::DnssecConfig;
pub use errors::ConfigError;
pub use resolver::{ResolverConfig, RetryBackoff};
pub use upstream::{parse_server_addr, RotationStrategy, TransportType};

//! Ferrous Resolver Domain Layer
pub mod config;
pub mod dns_record;
pub mod domain_name;
pub mod errors;

pub use config::{
    CacheConfig, ConfigError, DnssecConfig, ResolverConfig, RetryBackoff, RotationStrategy,
    TransportType,
};
pub use dns_record::{CaaRecord, MxRecord, Rcode, RecordData, RecordType, SoaRecord, SrvRecord};
pub use domain_name::DomainName;
pub use errors::DomainError;

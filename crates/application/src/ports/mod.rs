mod dns_resolver;
mod dnssec_validator;
mod transport;

pub use dns_resolver::{CacheStats, DnsResolver, Resolution, ResolveOptions, ResolverStats};
pub use dnssec_validator::DnssecValidator;
pub use transport::{DnsTransport, TransportEndpoint};

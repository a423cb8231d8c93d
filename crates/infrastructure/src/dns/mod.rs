pub mod kernel;
pub mod plugins;
pub mod resolver;
pub mod transport;
pub mod wire;

pub use kernel::{EventKind, EventListener, Kernel, Plugin, ResolverEvent};
pub use plugins::{
    CacheKey, CachedAnswer, HealthCheckPlugin, QueryBuilder, QueryLogPlugin, ResolverChain,
    ResponseCache, RetryPolicy,
};
pub use resolver::{reverse_name, Resolver, ResolverBuilder};
pub use transport::{TcpTransport, UdpTransport};

#![allow(dead_code)]

mod fake_transport;
mod replies;

pub use fake_transport::{FakeTransport, Responder};
pub use replies::{answer_reply, nxdomain_reply, query_parts, rcode_reply, truncated_reply};

use ferrous_resolver_domain::{CacheConfig, ResolverConfig};
use tracing_subscriber::EnvFilter;

/// Routes resolver logs to the test output. `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config pointing at `servers` with health checks off and a 50 ms timeout.
pub fn test_config(servers: &[&str]) -> ResolverConfig {
    ResolverConfig {
        servers: servers.iter().map(|s| s.to_string()).collect(),
        timeout_ms: 50,
        retries: 0,
        retry_delay_ms: 10,
        cache: CacheConfig::default(),
        ..ResolverConfig::default()
    }
}

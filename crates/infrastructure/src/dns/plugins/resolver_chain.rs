use crate::dns::kernel::Plugin;
use async_trait::async_trait;
use dashmap::DashSet;
use ferrous_resolver_domain::{DomainError, RotationStrategy};
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing::{debug, info, warn};

pub const PLUGIN_NAME: &str = "resolver-chain";

/// Upstream selection with per-server failure tracking.
///
/// When every server is marked failed, selection falls back to the full list
/// rather than refusing to query.
pub struct ResolverChain {
    servers: Vec<SocketAddr>,
    strategy: RotationStrategy,
    cursor: Mutex<usize>,
    failed: DashSet<SocketAddr>,
}

impl ResolverChain {
    pub fn new(servers: Vec<SocketAddr>, strategy: RotationStrategy) -> Result<Self, DomainError> {
        if servers.is_empty() {
            return Err(DomainError::ConfigError(
                "resolver chain needs at least one upstream server".into(),
            ));
        }
        Ok(Self {
            servers,
            strategy,
            cursor: Mutex::new(0),
            failed: DashSet::new(),
        })
    }

    pub fn servers(&self) -> &[SocketAddr] {
        &self.servers
    }

    pub fn strategy(&self) -> RotationStrategy {
        self.strategy
    }

    pub fn get_next(&self) -> SocketAddr {
        let server = match self.strategy {
            RotationStrategy::Failover => self.next_failover(),
            RotationStrategy::RoundRobin => self.next_round_robin(),
            RotationStrategy::Random => self.next_random(),
        };
        debug!(server = %server, strategy = self.strategy.as_str(), "Upstream selected");
        server
    }

    fn next_failover(&self) -> SocketAddr {
        self.servers
            .iter()
            .copied()
            .find(|s| !self.failed.contains(s))
            .unwrap_or(self.servers[0])
    }

    fn next_round_robin(&self) -> SocketAddr {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let len = self.servers.len();
        let start = *cursor % len;

        let index = (0..len)
            .map(|i| (start + i) % len)
            .find(|&i| !self.failed.contains(&self.servers[i]))
            .unwrap_or(start);

        *cursor = (index + 1) % len;
        self.servers[index]
    }

    fn next_random(&self) -> SocketAddr {
        let healthy: Vec<SocketAddr> = self
            .servers
            .iter()
            .copied()
            .filter(|s| !self.failed.contains(s))
            .collect();
        let pool = if healthy.is_empty() {
            &self.servers
        } else {
            &healthy
        };
        pool[fastrand::usize(..pool.len())]
    }

    /// Returns true if `server` was not already marked failed.
    pub fn mark_failed(&self, server: SocketAddr) -> bool {
        let newly = self.failed.insert(server);
        if newly {
            warn!(server = %server, "Upstream marked failed");
        }
        newly
    }

    pub fn mark_succeeded(&self, server: SocketAddr) {
        if self.failed.remove(&server).is_some() {
            info!(server = %server, "Upstream recovered");
        }
    }

    pub fn reset_failed(&self) {
        self.failed.clear();
    }

    pub fn is_failed(&self, server: &SocketAddr) -> bool {
        self.failed.contains(server)
    }

    pub fn is_healthy(&self, server: &SocketAddr) -> bool {
        self.servers.contains(server) && !self.is_failed(server)
    }

    /// Failed servers, in configuration order.
    pub fn failed_servers(&self) -> Vec<SocketAddr> {
        self.servers
            .iter()
            .copied()
            .filter(|s| self.failed.contains(s))
            .collect()
    }
}

#[async_trait]
impl Plugin for ResolverChain {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }
}
